//! Managed retrieval-QA chain: Pinecone + OpenAI, streamed as
//! `text/event-stream`.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use docqa_chat::{providers, ChatPromptTemplate, ChatQuery};
use docqa_core::QaChainSettings;
use docqa_retrieve::{OpenAiEmbeddings, PineconeStore, Retriever};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use super::validated_query;
use crate::error::{ApiError, JsonBody};
use crate::state::AppState;
use crate::streaming::event_stream_response;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(qa_chain))
}

async fn qa_chain(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ChatQuery>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("qa_chain", %request_id);

    async move {
        let query = validated_query(&req)?;
        let settings = QaChainSettings::from_env(state.env.as_ref())?;

        let store = PineconeStore::connect(state.http.clone(), &settings.pinecone).await?;
        let embeddings = OpenAiEmbeddings::new(state.http.clone(), &settings.openai);
        let retriever = Retriever::new(Box::new(embeddings), Box::new(store));

        let sources = retriever.retrieve(query, settings.top_k).await?;
        info!("Retrieved {} source documents", sources.len());
        for doc in &sources {
            debug!(
                id = %doc.id,
                score = doc.score,
                source = doc.source().unwrap_or("-"),
                "Source document"
            );
        }

        let messages = ChatPromptTemplate::qa_chain().format_with_documents(&sources, query);
        let tokens = providers::connect_openai(
            &state.http,
            &settings.openai,
            &messages,
            settings.temperature,
        )
        .await?;

        Ok::<_, ApiError>(event_stream_response(tokens, request_id, sources.len()))
    }
    .instrument(span)
    .await
}
