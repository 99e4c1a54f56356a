//! Chat request and message types.

use serde::{Deserialize, Serialize};

/// Chat message sent to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Incoming question, shared by both chat endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatQuery {
    pub query: String,
}

/// Error body returned by both chat endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
