//! Error types for docqa.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} is not defined.")]
    MissingEnv(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected client input. The message is surfaced to the caller as-is.
    #[error("{0}")]
    InvalidRequest(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{service} returned HTTP {status}: {body}")]
    Upstream {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("LLM error: {0}")]
    Llm(String),
}

impl Error {
    /// True when the failure was caused by the caller rather than by
    /// configuration or an upstream service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
