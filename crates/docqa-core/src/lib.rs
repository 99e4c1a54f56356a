//! docqa core: environment-backed configuration and the shared error type.

pub mod config;
pub mod error;

pub use config::{
    EnvSource, LocalPipelineSettings, OllamaSettings, OpenAiSettings, PineconeSettings,
    ProcessEnv, QaChainSettings, QdrantSettings, ServerConfig,
};
pub use error::{Error, Result};
