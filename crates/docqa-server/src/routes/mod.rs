//! HTTP route handlers.

pub mod chat;
pub mod local_chat;
pub mod status;

use std::sync::Arc;

use axum::Router;
use docqa_chat::ChatQuery;
use docqa_core::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(status::health_routes())
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(chat::routes())
        .merge(local_chat::routes())
        .merge(status::routes())
}

/// The trimmed question, or a client error when there is none.
pub(crate) fn validated_query(req: &ChatQuery) -> Result<&str, Error> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(Error::InvalidRequest("query must not be empty".into()));
    }
    Ok(query)
}
