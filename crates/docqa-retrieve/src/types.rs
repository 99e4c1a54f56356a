//! Retrieved document model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document returned by a similarity search. Request-scoped, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub id: String,
    /// Text used as prompt context.
    pub page_content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Similarity score as reported by the store (higher is closer).
    pub score: f32,
}

impl RetrievedDocument {
    /// `metadata.source`, when the ingester recorded one.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(Value::as_str)
    }
}
