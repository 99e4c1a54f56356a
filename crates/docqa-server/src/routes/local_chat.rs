//! Local pipeline: Qdrant + Ollama, composed step by step and streamed as
//! plain text.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use docqa_chat::{providers, ChatPromptTemplate, ChatQuery};
use docqa_core::LocalPipelineSettings;
use docqa_retrieve::{OllamaEmbeddings, QdrantStore, Retriever};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::validated_query;
use crate::error::{ApiError, JsonBody};
use crate::state::AppState;
use crate::streaming::text_stream_response;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat/local", post(local_pipeline))
}

async fn local_pipeline(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ChatQuery>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("local_pipeline", %request_id);

    async move {
        let query = validated_query(&req)?;
        let settings = LocalPipelineSettings::from_env(state.env.as_ref())?;

        // retrieve
        let retriever = Retriever::new(
            Box::new(OllamaEmbeddings::new(state.http.clone(), &settings.ollama)),
            Box::new(QdrantStore::new(state.http.clone(), &settings.qdrant)),
        );
        let documents = retriever.retrieve(query, settings.top_k).await?;
        info!("Retrieved {} documents", documents.len());

        // format + prompt
        let messages =
            ChatPromptTemplate::local_pipeline().format_with_documents(&documents, query);

        // generate, parsed to plain text chunks by the body helper
        let tokens = providers::connect_ollama(&state.http, &settings.ollama, &messages).await?;

        Ok::<_, ApiError>(text_stream_response(tokens, request_id))
    }
    .instrument(span)
    .await
}
