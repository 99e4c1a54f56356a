//! Self-hosted Qdrant collection client (REST API).

use async_trait::async_trait;
use docqa_core::{Error, QdrantSettings, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::http::{ensure_success, request_error};
use crate::store::VectorStore;
use crate::types::RetrievedDocument;

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    /// Either an unsigned integer or a UUID string.
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

pub struct QdrantStore {
    client: Client,
    search_url: String,
    api_key: Option<String>,
    content_key: String,
    metadata_key: String,
}

impl QdrantStore {
    pub fn new(client: Client, settings: &QdrantSettings) -> Self {
        Self {
            client,
            search_url: format!(
                "{}/collections/{}/points/search",
                settings.url, settings.collection
            ),
            api_key: settings.api_key.clone(),
            content_key: settings.content_key.clone(),
            metadata_key: settings.metadata_key.clone(),
        }
    }

    fn to_document(&self, point: ScoredPoint) -> RetrievedDocument {
        let mut payload = point.payload.unwrap_or_default();

        let page_content = match payload.remove(&self.content_key) {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let metadata = match payload.remove(&self.metadata_key) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let id = match point.id {
            Value::String(s) => s,
            other => other.to_string(),
        };

        RetrievedDocument {
            id,
            page_content,
            metadata,
            score: point.score,
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn similarity_search(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
        let mut request = self.client.post(&self.search_url).json(&SearchRequest {
            vector,
            limit: k,
            with_payload: true,
        });
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| request_error("qdrant", e))?;

        let parsed: SearchResponse = ensure_success("qdrant", response)
            .await?
            .json()
            .await
            .map_err(|e| Error::VectorStore(format!("Failed to parse Qdrant response: {}", e)))?;

        debug!("Qdrant returned {} points", parsed.result.len());

        Ok(parsed
            .result
            .into_iter()
            .map(|p| self.to_document(p))
            .collect())
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
