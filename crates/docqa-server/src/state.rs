//! Shared application state.

use std::sync::Arc;

use docqa_core::EnvSource;

/// Shared application state accessible from all route handlers.
///
/// Nothing here is mutable: each request reads its settings from `env` and
/// builds its own upstream clients on top of the shared connection pool.
pub struct AppState {
    pub http: reqwest::Client,
    pub env: Arc<dyn EnvSource>,
}

impl AppState {
    pub fn new(env: Arc<dyn EnvSource>) -> Self {
        Self::with_client(env, reqwest::Client::new())
    }

    pub fn with_client(env: Arc<dyn EnvSource>, http: reqwest::Client) -> Self {
        Self { http, env }
    }
}
