//! Structured update extraction from assistant replies.
//!
//! Two encodings are recognized; whichever starts first in the reply wins:
//!
//! 1. A fenced block tagged `aura-update`, terminated by the next fence or
//!    by the end of the reply (a reply cut off at the token limit).
//!    Nested objects are safe because the terminator is not a brace.
//! 2. An inline object starting with `{"action":"update"`. It is read with
//!    a streaming JSON parser that consumes exactly one balanced value, so
//!    nested objects and braces inside strings are handled. When the object
//!    is not valid JSON, the span up to the first `}` is treated as the
//!    fragment.
//!
//! Whatever is recognized as the fragment is removed from the display text,
//! whether or not it parsed. Any further fenced blocks are removed too but
//! not applied.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::UpdateError;

/// Info string of the fenced update block.
pub const UPDATE_FENCE: &str = "aura-update";

static FENCED_UPDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```aura-update[ \t]*(?:\r?\n(.*?))?(?:```|\z)").expect("fenced update pattern is valid")
});

static INLINE_UPDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\s*"action"\s*:\s*"update""#).expect("inline update pattern is valid")
});

/// The structured update object a reply may embed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateEnvelope {
    pub action: String,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

/// A recognized update fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateFragment {
    /// Parsed; `data` is ready to merge (absent means nothing to merge).
    Parsed(Option<Map<String, Value>>),
    /// Present but unusable. The profile must not change.
    Rejected { fragment: String, reason: String },
}

/// A reply split into what the user sees and what the profile receives.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedReply {
    pub display_text: String,
    pub update: Option<UpdateFragment>,
}

impl ExtractedReply {
    /// The merge payload, if a valid update with data was found.
    pub fn update_data(&self) -> Option<&Map<String, Value>> {
        match &self.update {
            Some(UpdateFragment::Parsed(Some(data))) => Some(data),
            _ => None,
        }
    }
}

/// Split `reply` into display text and an optional update fragment.
pub fn extract_update(reply: &str) -> ExtractedReply {
    let fenced = FENCED_UPDATE.captures(reply);
    let inline = INLINE_UPDATE.find(reply).map(|m| m.start());

    let mut extracted = match (fenced, inline) {
        (Some(caps), Some(start)) if start < fence_start(&caps) => inline_update(reply, start),
        (Some(caps), _) => fenced_update(reply, &caps),
        (None, Some(start)) => inline_update(reply, start),
        (None, None) => {
            return ExtractedReply {
                display_text: reply.trim().to_string(),
                update: None,
            };
        }
    };

    // Only the first fragment is applied, but no fence is ever shown.
    if FENCED_UPDATE.is_match(&extracted.display_text) {
        tracing::debug!("Hiding extra update blocks");
        extracted.display_text = FENCED_UPDATE
            .replace_all(&extracted.display_text, "")
            .trim()
            .to_string();
    }
    extracted
}

fn fence_start(caps: &Captures<'_>) -> usize {
    caps.get(0).map_or(0, |m| m.start())
}

fn fenced_update(reply: &str, caps: &Captures<'_>) -> ExtractedReply {
    let (start, end) = caps.get(0).map_or((0, 0), |m| (m.start(), m.end()));
    let fragment = caps.get(1).map_or("", |m| m.as_str()).trim();
    let update = match serde_json::from_str::<UpdateEnvelope>(fragment) {
        Ok(envelope) => accept(envelope, fragment),
        Err(e) => reject(fragment, UpdateError::Malformed(e.to_string())),
    };
    ExtractedReply {
        display_text: strip(reply, start, end),
        update: Some(update),
    }
}

fn inline_update(reply: &str, start: usize) -> ExtractedReply {
    let tail = &reply[start..];
    let mut stream = serde_json::Deserializer::from_str(tail).into_iter::<Value>();
    let (end, update) = match stream.next() {
        Some(Ok(value)) => {
            let end = start + stream.byte_offset();
            let fragment = &reply[start..end];
            let update = match serde_json::from_value::<UpdateEnvelope>(value) {
                Ok(envelope) => accept(envelope, fragment),
                Err(e) => reject(fragment, UpdateError::Malformed(e.to_string())),
            };
            (end, update)
        }
        Some(Err(e)) => {
            let end = tail.find('}').map(|i| start + i + 1).unwrap_or(reply.len());
            (end, reject(&reply[start..end], UpdateError::Malformed(e.to_string())))
        }
        None => (
            reply.len(),
            reject(tail, UpdateError::Malformed("empty fragment".to_string())),
        ),
    };

    ExtractedReply {
        display_text: strip(reply, start, end),
        update: Some(update),
    }
}

fn accept(envelope: UpdateEnvelope, fragment: &str) -> UpdateFragment {
    if envelope.action == "update" {
        UpdateFragment::Parsed(envelope.data)
    } else {
        reject(fragment, UpdateError::UnsupportedAction(envelope.action))
    }
}

fn reject(fragment: &str, err: UpdateError) -> UpdateFragment {
    tracing::warn!(fragment = %fragment, error = %err, "Ignoring update fragment");
    UpdateFragment::Rejected {
        fragment: fragment.to_string(),
        reason: err.to_string(),
    }
}

/// Remove `reply[start..end]` and trim the ends of what remains.
fn strip(reply: &str, start: usize, end: usize) -> String {
    let mut out = String::with_capacity(reply.len() - (end - start));
    out.push_str(&reply[..start]);
    out.push_str(&reply[end..]);
    out.trim().to_string()
}
