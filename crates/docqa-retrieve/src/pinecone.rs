//! Managed Pinecone index client.
//!
//! The data-plane host is either configured directly or derived from the
//! project name returned by the environment's controller.

use async_trait::async_trait;
use docqa_core::{Error, PineconeSettings, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::http::{ensure_success, request_error};
use crate::store::VectorStore;
use crate::types::RetrievedDocument;

/// Metadata key the ingester stores page content under.
pub const TEXT_KEY: &str = "text";

#[derive(Deserialize)]
struct WhoAmI {
    project_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

pub struct PineconeStore {
    client: Client,
    api_key: String,
    host: String,
    namespace: Option<String>,
}

impl PineconeStore {
    /// Initialize the client for an existing index.
    pub async fn connect(client: Client, settings: &PineconeSettings) -> Result<Self> {
        let host = match &settings.index_host {
            Some(host) => normalize_host(host),
            None => {
                let controller = settings
                    .controller_url
                    .clone()
                    .unwrap_or_else(|| controller_url(&settings.environment));
                let project = whoami(&client, &settings.api_key, &controller).await?;
                index_host(&settings.index, &project, &settings.environment)
            }
        };

        info!("Using Pinecone index {} at {}", settings.index, host);

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            host,
            namespace: settings.namespace.clone(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn similarity_search(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
        let request = QueryRequest {
            vector,
            top_k: k,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/query", self.host))
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("pinecone", e))?;

        let parsed: QueryResponse = ensure_success("pinecone", response)
            .await?
            .json()
            .await
            .map_err(|e| Error::VectorStore(format!("Failed to parse Pinecone response: {}", e)))?;

        debug!("Pinecone returned {} matches", parsed.matches.len());

        Ok(parsed.matches.into_iter().map(into_document).collect())
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

fn controller_url(environment: &str) -> String {
    format!("https://controller.{}.pinecone.io", environment)
}

async fn whoami(client: &Client, api_key: &str, controller: &str) -> Result<String> {
    let url = format!("{}/actions/whoami", controller);
    let response = client
        .get(&url)
        .header("Api-Key", api_key)
        .send()
        .await
        .map_err(|e| request_error("pinecone controller", e))?;

    let who: WhoAmI = ensure_success("pinecone controller", response)
        .await?
        .json()
        .await
        .map_err(|e| Error::VectorStore(format!("Failed to parse whoami response: {}", e)))?;

    Ok(who.project_name)
}

fn index_host(index: &str, project: &str, environment: &str) -> String {
    format!("https://{}-{}.svc.{}.pinecone.io", index, project, environment)
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Page content lives under `TEXT_KEY`; the rest of the metadata is kept.
fn into_document(m: QueryMatch) -> RetrievedDocument {
    let mut metadata = m.metadata.unwrap_or_default();
    let page_content = match metadata.remove(TEXT_KEY) {
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
        None => {
            warn!("Pinecone match {} has no '{}' metadata", m.id, TEXT_KEY);
            String::new()
        }
    };

    RetrievedDocument {
        id: m.id,
        page_content,
        metadata,
        score: m.score,
    }
}
