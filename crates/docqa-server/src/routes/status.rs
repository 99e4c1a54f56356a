//! Health and configuration status.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use docqa_core::{LocalPipelineSettings, QaChainSettings};

use crate::state::AppState;

pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat/status", get(get_status))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Which handlers can run with the current environment. Never exposes values.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let env = state.env.as_ref();
    let qa_missing = QaChainSettings::missing(env);
    let local_missing = LocalPipelineSettings::missing(env);

    Json(serde_json::json!({
        "qaChain": {
            "configured": qa_missing.is_empty(),
            "missing": qa_missing,
        },
        "localPipeline": {
            "configured": local_missing.is_empty(),
            "missing": local_missing,
        },
    }))
}
