//! Embedding clients.
//!
//! The `Embedder` trait abstracts over query embedding. Implementations:
//! - `OpenAiEmbeddings`: OpenAI `/v1/embeddings`
//! - `OllamaEmbeddings`: local Ollama `/api/embeddings`

use async_trait::async_trait;
use docqa_core::{Error, OllamaSettings, OpenAiSettings, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{ensure_success, request_error};

/// Trait for embedding backends.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

#[derive(Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI embeddings API client.
pub struct OpenAiEmbeddings {
    client: Client,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddings {
    pub fn new(client: Client, settings: &OpenAiSettings) -> Self {
        Self {
            client,
            url: format!("{}/v1/embeddings", settings.base_url),
            api_key: settings.api_key.clone(),
            model: settings.embedding_model.clone(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        // Newlines degrade ada-002 similarity.
        let input = text.replace('\n', " ");

        debug!("Embedding query with OpenAI model {}", self.model);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&OpenAiEmbeddingRequest {
                model: &self.model,
                input: &input,
            })
            .send()
            .await
            .map_err(|e| request_error("openai embeddings", e))?;

        let parsed: OpenAiEmbeddingResponse = ensure_success("openai embeddings", response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse OpenAI response: {}", e)))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| Error::Embedding("OpenAI returned no embedding".into()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

/// Ollama embeddings client (nomic-embed-text or similar).
pub struct OllamaEmbeddings {
    client: Client,
    url: String,
    model: String,
}

impl OllamaEmbeddings {
    pub fn new(client: Client, settings: &OllamaSettings) -> Self {
        Self {
            client,
            url: format!("{}/api/embeddings", settings.base_url),
            model: settings.embedding_model.clone(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Embedding query with Ollama model {}", self.model);

        let response = self
            .client
            .post(&self.url)
            .json(&OllamaEmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| request_error("ollama embeddings", e))?;

        let parsed: OllamaEmbeddingResponse = ensure_success("ollama embeddings", response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        if parsed.embedding.is_empty() {
            return Err(Error::Embedding(format!(
                "Ollama returned an empty embedding for model {}",
                self.model
            )));
        }
        Ok(parsed.embedding)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
