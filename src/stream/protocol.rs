//! Stream message vocabulary.
//!
//! Frames are JSON text with a `type` tag:
//!
//! ```text
//! inbound:  {"type":"token","content":"Hel"}
//!           {"type":"message","content":"Hello there"}
//!           {"type":"final"}  or  {"type":"final","content":"..."}
//!           {"type":"error","error":"session expired"}
//! outbound: {"type":"chat.message","text":"hi","session_id":"s1","meta":{...}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Decoding or encoding failure.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Messages pushed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingMessage {
    /// Incremental piece of a reply being streamed.
    Token { content: String },
    /// A complete message.
    Message { content: String },
    /// End of a reply, optionally with trailing content.
    Final {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    /// Backend-side error notice.
    Error { error: String },
}

impl IncomingMessage {
    /// Decode one frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(frame)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum OutgoingKind {
    #[serde(rename = "chat.message")]
    ChatMessage,
}

/// A chat message sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    #[serde(rename = "type")]
    kind: OutgoingKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl OutgoingMessage {
    pub fn chat(text: impl Into<String>) -> Self {
        Self {
            kind: OutgoingKind::ChatMessage,
            text: text.into(),
            session_id: None,
            meta: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Attach one metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
