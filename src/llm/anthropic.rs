//! Anthropic Messages API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatCompletion, ChatMessage, CompletionRequest, Role};
use crate::error::LlmError;

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const WEB_SEARCH_TOOL_TYPE: &str = "web_search_20250305";
const WEB_SEARCH_TOOL_NAME: &str = "web_search";

/// Server-side tool descriptor sent with each request.
#[derive(Debug, Clone, Serialize)]
struct ToolDescriptor {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'static str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<&'a ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDescriptor>,
}

/// Content block in a Messages API response. Only text blocks are read;
/// tool use and search result blocks are skipped.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// Client for the Anthropic Messages endpoint.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    api_url: String,
    web_search: bool,
}

impl AnthropicClient {
    pub fn new(
        api_key: SecretString,
        model: &str,
        max_tokens: u32,
        api_url: &str,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            api_key,
            model: model.to_string(),
            max_tokens,
            api_url: api_url.to_string(),
            web_search: true,
        })
    }

    /// Toggle the web search tool descriptor.
    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        if self.web_search {
            vec![ToolDescriptor {
                kind: WEB_SEARCH_TOOL_TYPE,
                name: WEB_SEARCH_TOOL_NAME,
            }]
        } else {
            Vec::new()
        }
    }
}

/// The endpoint requires the first message to come from the user and
/// rejects empty content, so leading assistant turns (such as the greeting)
/// and blank turns are dropped.
fn wire_messages(messages: &[ChatMessage]) -> Vec<&ChatMessage> {
    messages
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .skip_while(|m| m.role != Role::User)
        .collect()
}

/// Join all text blocks, in order, with newlines.
fn reply_text(response: MessagesResponse) -> String {
    response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl ChatCompletion for AnthropicClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let messages = wire_messages(&request.messages);
        if messages.is_empty() {
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: "no user message to send".to_string(),
            });
        }

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: &request.system,
            messages,
            tools: self.tools(),
        };

        let api_key = HeaderValue::from_str(self.api_key.expose_secret()).map_err(|_| {
            LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            }
        })?;

        debug!(model = %self.model, messages = body.messages.len(), "Sending completion request");

        let resp = self
            .http
            .post(&self.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let retry = retry_after(resp.headers());
            let text = resp.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthFailed {
                    provider: PROVIDER.to_string(),
                },
                StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
                    provider: PROVIDER.to_string(),
                    retry_after: retry,
                },
                _ => LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: format!("HTTP {status}: {text}"),
                },
            });
        }

        let parsed: MessagesResponse = resp.json().await.map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;

        Ok(reply_text(parsed))
    }
}
