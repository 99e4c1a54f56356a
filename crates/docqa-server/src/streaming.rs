//! Pipe a model token stream into an HTTP response body.
//!
//! Tokens are written verbatim as they arrive. An upstream error after the
//! headers went out can no longer become a JSON error, so it aborts the body
//! instead. The client sees a truncated transfer. If the client goes away,
//! axum drops the body, which drops the upstream stream and its connection.

use std::io;

use axum::body::{Body, Bytes};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use docqa_chat::{BoxedStream, StreamChunk};
use tokio_stream::StreamExt;
use tracing::{error, info};
use uuid::Uuid;

pub const EVENT_STREAM: &str = "text/event-stream";
pub const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Number of retrieved source documents used for the answer.
pub static SOURCE_DOCUMENTS: HeaderName = HeaderName::from_static("x-source-documents");

/// Convert model chunks into body frames.
pub fn token_body(tokens: BoxedStream, request_id: Uuid) -> Body {
    let frames = tokens.filter_map(move |chunk| match chunk {
        StreamChunk::Token(text) => Some(Ok(Bytes::from(text))),
        StreamChunk::Done { tokens_used } => {
            info!(%request_id, tokens_used, "Answer stream finished");
            None
        }
        StreamChunk::Error(message) => {
            error!(%request_id, "Answer stream aborted: {}", message);
            Some(Err(io::Error::other(message)))
        }
    });
    Body::from_stream(frames)
}

/// `text/event-stream` response carrying raw tokens.
pub fn event_stream_response(tokens: BoxedStream, request_id: Uuid, sources: usize) -> Response {
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM)),
            (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (SOURCE_DOCUMENTS.clone(), HeaderValue::from(sources)),
        ],
        token_body(tokens, request_id),
    )
        .into_response()
}

/// Plain chunked text response.
pub fn text_stream_response(tokens: BoxedStream, request_id: Uuid) -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static(PLAIN_TEXT))],
        token_body(tokens, request_id),
    )
        .into_response()
}
