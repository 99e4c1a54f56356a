//! Configuration read from the process environment.
//!
//! Server settings are read once at startup. The per-handler settings
//! (`QaChainSettings`, `LocalPipelineSettings`) are read on every request, so a
//! changed key takes effect without a restart.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_CHAT_MODEL: &str = "llama3";
pub const DEFAULT_OLLAMA_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Sampling temperature of the streaming QA chain.
pub const QA_CHAIN_TEMPERATURE: f64 = 0.9;
/// Number of documents the QA chain stuffs into its prompt.
pub const QA_CHAIN_TOP_K: usize = 1;
pub const DEFAULT_LOCAL_TOP_K: usize = 4;

/// Source of configuration variables.
pub trait EnvSource: Send + Sync {
    /// Look up a variable. Empty values count as unset.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty()).cloned()
    }
}

fn require(env: &dyn EnvSource, key: &str) -> Result<String> {
    env.var(key).ok_or_else(|| Error::MissingEnv(key.to_string()))
}

fn or_default(env: &dyn EnvSource, key: &str, default: &str) -> String {
    env.var(key).unwrap_or_else(|| default.to_string())
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn missing(env: &dyn EnvSource, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter(|k| env.var(k).is_none())
        .map(|k| k.to_string())
        .collect()
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(env: &dyn EnvSource) -> Result<Self> {
        let port = match env.var("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| Error::Config(format!("PORT must be a port number, got {:?}", p)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: or_default(env, "HOST", DEFAULT_HOST),
            port,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// OpenAI chat + embeddings settings.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
}

impl OpenAiSettings {
    pub fn from_env(env: &dyn EnvSource) -> Result<Self> {
        Ok(Self {
            api_key: require(env, "OPENAI_API_KEY")?,
            base_url: trim_base(or_default(env, "OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL)),
            chat_model: or_default(env, "OPENAI_MODEL", DEFAULT_OPENAI_CHAT_MODEL),
            embedding_model: or_default(
                env,
                "OPENAI_EMBEDDING_MODEL",
                DEFAULT_OPENAI_EMBEDDING_MODEL,
            ),
        })
    }
}

/// Managed Pinecone index settings.
#[derive(Debug, Clone)]
pub struct PineconeSettings {
    pub api_key: String,
    pub environment: String,
    pub index: String,
    /// Explicit data-plane host. When unset it is resolved through the
    /// controller of `environment`.
    pub index_host: Option<String>,
    /// Controller base used to resolve `index_host`. Defaults to
    /// `https://controller.{environment}.pinecone.io`.
    pub controller_url: Option<String>,
    pub namespace: Option<String>,
}

impl PineconeSettings {
    pub fn from_env(env: &dyn EnvSource) -> Result<Self> {
        Ok(Self {
            api_key: require(env, "PINECONE_API_KEY")?,
            environment: require(env, "PINECONE_ENVIRONMENT")?,
            index: require(env, "PINECONE_INDEX")?,
            index_host: env.var("PINECONE_INDEX_HOST").map(trim_base),
            controller_url: env.var("PINECONE_CONTROLLER_URL").map(trim_base),
            namespace: env.var("PINECONE_NAMESPACE"),
        })
    }
}

/// Everything the managed QA chain needs for one request.
#[derive(Debug, Clone)]
pub struct QaChainSettings {
    pub openai: OpenAiSettings,
    pub pinecone: PineconeSettings,
    pub top_k: usize,
    pub temperature: f64,
}

impl QaChainSettings {
    pub const REQUIRED: &'static [&'static str] = &[
        "OPENAI_API_KEY",
        "PINECONE_API_KEY",
        "PINECONE_ENVIRONMENT",
        "PINECONE_INDEX",
    ];

    pub fn from_env(env: &dyn EnvSource) -> Result<Self> {
        Ok(Self {
            openai: OpenAiSettings::from_env(env)?,
            pinecone: PineconeSettings::from_env(env)?,
            top_k: QA_CHAIN_TOP_K,
            temperature: QA_CHAIN_TEMPERATURE,
        })
    }

    /// Required variables that are absent.
    pub fn missing(env: &dyn EnvSource) -> Vec<String> {
        missing(env, Self::REQUIRED)
    }
}

/// Self-hosted Qdrant collection settings.
#[derive(Debug, Clone)]
pub struct QdrantSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    /// Payload key holding the page content.
    pub content_key: String,
    /// Payload key holding the document metadata.
    pub metadata_key: String,
}

impl QdrantSettings {
    pub fn from_env(env: &dyn EnvSource) -> Result<Self> {
        Ok(Self {
            url: trim_base(or_default(env, "QDRANT_URL", DEFAULT_QDRANT_URL)),
            api_key: env.var("QDRANT_API_KEY"),
            collection: require(env, "QDRANT_COLLECTION")?,
            content_key: or_default(env, "QDRANT_CONTENT_KEY", "content"),
            metadata_key: or_default(env, "QDRANT_METADATA_KEY", "metadata"),
        })
    }
}

/// Locally served Ollama models.
#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
}

impl OllamaSettings {
    pub fn from_env(env: &dyn EnvSource) -> Self {
        Self {
            base_url: trim_base(or_default(env, "OLLAMA_BASE_URL", DEFAULT_OLLAMA_BASE_URL)),
            chat_model: or_default(env, "OLLAMA_MODEL", DEFAULT_OLLAMA_CHAT_MODEL),
            embedding_model: or_default(
                env,
                "OLLAMA_EMBEDDING_MODEL",
                DEFAULT_OLLAMA_EMBEDDING_MODEL,
            ),
        }
    }
}

/// Everything the local pipeline needs for one request.
#[derive(Debug, Clone)]
pub struct LocalPipelineSettings {
    pub qdrant: QdrantSettings,
    pub ollama: OllamaSettings,
    pub top_k: usize,
}

impl LocalPipelineSettings {
    pub const REQUIRED: &'static [&'static str] = &["QDRANT_COLLECTION"];

    pub fn from_env(env: &dyn EnvSource) -> Result<Self> {
        let top_k = match env.var("LOCAL_TOP_K") {
            Some(k) => match k.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::Config(format!(
                        "LOCAL_TOP_K must be a positive integer, got {:?}",
                        k
                    )))
                }
            },
            None => DEFAULT_LOCAL_TOP_K,
        };

        Ok(Self {
            qdrant: QdrantSettings::from_env(env)?,
            ollama: OllamaSettings::from_env(env),
            top_k,
        })
    }

    pub fn missing(env: &dyn EnvSource) -> Vec<String> {
        missing(env, Self::REQUIRED)
    }
}
