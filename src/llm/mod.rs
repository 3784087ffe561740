//! Chat completion integration for Aura.
//!
//! One request per user turn: the instruction template built from the
//! profile plus the trailing window of the transcript. The reply is plain
//! text; any structured update inside it is handled by
//! [`crate::assistant::extract`].

pub mod anthropic;
pub mod prompts;

pub use anthropic::AnthropicClient;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AuraConfig;
use crate::error::LlmError;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A single completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            system: system.into(),
            messages,
        }
    }
}

/// A chat completion backend.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    fn model_name(&self) -> &str;

    /// Send the request and return the reply text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

/// Create the completion client described by `config`.
pub fn create_client(config: &AuraConfig) -> Result<Arc<dyn ChatCompletion>, LlmError> {
    let client = AnthropicClient::new(
        config.api_key.clone(),
        &config.model,
        config.max_tokens,
        &config.api_url,
    )?
    .with_web_search(config.web_search);
    tracing::info!(model = %config.model, web_search = config.web_search, "Using Anthropic");
    Ok(Arc::new(client))
}
