//! docqa chat: streaming chat-model clients and the QA prompts.
//!
//! Tokens arrive over SSE (OpenAI) or NDJSON (Ollama) and are surfaced as a
//! uniform `StreamChunk` stream. Prompts are built from retrieved documents.

pub mod prompt;
pub mod providers;
pub mod types;

pub use prompt::ChatPromptTemplate;
pub use providers::{BoxedStream, StreamChunk};
pub use types::*;
