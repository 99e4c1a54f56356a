//! docqa server: question answering over a vector store, streamed.

pub mod error;
pub mod routes;
pub mod state;
pub mod streaming;

pub use state::AppState;
