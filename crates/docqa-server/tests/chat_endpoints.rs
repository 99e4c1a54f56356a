//! End-to-end tests for both chat endpoints.
//!
//! The router runs in-process via `oneshot`; OpenAI, Pinecone, Qdrant and
//! Ollama are replaced by one axum mock bound to an ephemeral port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use docqa_core::{EnvSource, PineconeSettings};
use docqa_retrieve::PineconeStore;
use docqa_server::{routes, AppState};
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

type Recorded = Arc<Mutex<Vec<(String, Value)>>>;

fn record(recorded: &Recorded, path: &str, body: &Value) {
    recorded.lock().unwrap().push((path.to_string(), body.clone()));
}

async fn openai_embeddings(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    record(&rec, "/v1/embeddings", &body);
    Json(json!({ "data": [{ "embedding": [0.1, 0.2, 0.3] }] }))
}

async fn openai_chat(State(rec): State<Recorded>, Json(body): Json<Value>) -> Response {
    record(&rec, "/v1/chat/completions", &body);
    let sse = if body["model"] == "broken-model" {
        concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"V1 \"}}]}\n\n",
            "data: {\"error\":{\"message\":\"connection reset\"}}\n\n",
        )
    } else {
        concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"V1 is \"}}]}\n\n",
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"120 knots.\"}}]}\n\n",
            "data: [DONE]\n\n",
        )
    };
    ([(header::CONTENT_TYPE, "text/event-stream")], sse).into_response()
}

async fn pinecone_query(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    record(&rec, "/query", &body);
    Json(json!({
        "matches": [{
            "id": "ops-manual-12",
            "score": 0.93,
            "metadata": { "text": "V1 for the A320 at MTOW is 120 knots.", "source": "ops.pdf" }
        }],
        "namespace": ""
    }))
}

async fn pinecone_whoami(State(rec): State<Recorded>, headers: HeaderMap) -> Json<Value> {
    let api_key = headers
        .get("api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    record(&rec, "/actions/whoami", &json!({ "api_key": api_key }));
    Json(json!({ "project_name": "proj42", "user_label": "default", "user_name": "u-1" }))
}

async fn qdrant_search(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    record(&rec, "/collections/handbook/points/search", &body);
    Json(json!({
        "result": [{
            "id": 3,
            "score": 0.8,
            "payload": { "content": "Employees get 25 vacation days.", "metadata": {} }
        }],
        "status": "ok"
    }))
}

async fn ollama_embeddings(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    record(&rec, "/api/embeddings", &body);
    Json(json!({ "embedding": [0.4, 0.5] }))
}

async fn ollama_chat(State(rec): State<Recorded>, Json(body): Json<Value>) -> Response {
    record(&rec, "/api/chat", &body);
    let ndjson = if body["model"] == "broken-model" {
        concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"25 \"},\"done\":false}\n",
            "{\"error\":\"out of memory\"}\n",
        )
    } else {
        concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"25 \"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"days.\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
        )
    };
    ([(header::CONTENT_TYPE, "application/x-ndjson")], ndjson).into_response()
}

async fn spawn_upstream() -> (String, Recorded) {
    let recorded: Recorded = Arc::default();
    let app = Router::new()
        .route("/v1/embeddings", post(openai_embeddings))
        .route("/v1/chat/completions", post(openai_chat))
        .route("/query", post(pinecone_query))
        .route("/actions/whoami", get(pinecone_whoami))
        .route("/collections/handbook/points/search", post(qdrant_search))
        .route("/api/embeddings", post(ollama_embeddings))
        .route("/api/chat", post(ollama_chat))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), recorded)
}

fn qa_env(base: &str) -> HashMap<String, String> {
    [
        ("OPENAI_API_KEY", "sk-test".to_string()),
        ("OPENAI_BASE_URL", base.to_string()),
        ("PINECONE_API_KEY", "pc-test".to_string()),
        ("PINECONE_ENVIRONMENT", "test-env".to_string()),
        ("PINECONE_INDEX", "ops".to_string()),
        ("PINECONE_INDEX_HOST", base.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn local_env(base: &str) -> HashMap<String, String> {
    [
        ("QDRANT_URL", base.to_string()),
        ("QDRANT_COLLECTION", "handbook".to_string()),
        ("OLLAMA_BASE_URL", base.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn app(env: HashMap<String, String>) -> Router {
    let env: Arc<dyn EnvSource> = Arc::new(env);
    routes::build_router(Arc::new(AppState::with_client(env, test_client())))
}

fn test_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn error_message(response: Response) -> String {
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    body["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_qa_chain_streams_answer() {
    let (base, recorded) = spawn_upstream().await;
    let response = app(qa_env(&base))
        .oneshot(post_json("/api/chat", r#"{"query":"What is V1?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(response.headers()["x-source-documents"], "1");
    assert_eq!(body_string(response).await, "V1 is 120 knots.");

    let recorded = recorded.lock().unwrap();
    let (_, query) = recorded.iter().find(|(p, _)| p == "/query").unwrap();
    assert_eq!(query["topK"], 1);
    assert_eq!(query["includeMetadata"], true);

    let (_, chat) = recorded
        .iter()
        .find(|(p, _)| p == "/v1/chat/completions")
        .unwrap();
    assert_eq!(chat["temperature"], 0.9);
    assert_eq!(chat["stream"], true);
    let system = chat["messages"][0]["content"].as_str().unwrap();
    assert!(system.contains("V1 for the A320 at MTOW is 120 knots."));
    assert_eq!(chat["messages"][1]["content"], "What is V1?");
}

#[tokio::test]
async fn test_qa_chain_missing_api_key() {
    let (base, _) = spawn_upstream().await;
    let mut env = qa_env(&base);
    env.remove("OPENAI_API_KEY");

    let response = app(env)
        .oneshot(post_json("/api/chat", r#"{"query":"What is V1?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(response).await, "OPENAI_API_KEY is not defined.");
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let response = app(HashMap::new())
        .oneshot(post_json("/api/chat", "{\"query\": "))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(response)
        .await
        .starts_with("Failed to parse the request body as JSON"));
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    let response = app(HashMap::new())
        .oneshot(post_json("/api/chat/local", r#"{"query":"   "}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "query must not be empty");
}

#[tokio::test]
async fn test_vector_store_failure_is_json_error() {
    let (base, _) = spawn_upstream().await;
    let mut env = qa_env(&base);
    env.insert("PINECONE_INDEX_HOST".into(), format!("{}/missing", base));

    let response = app(env)
        .oneshot(post_json("/api/chat", r#"{"query":"What is V1?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_message(response)
        .await
        .starts_with("pinecone returned HTTP 404"));
}

#[tokio::test]
async fn test_mid_stream_failure_aborts_body() {
    let (base, _) = spawn_upstream().await;
    let mut env = qa_env(&base);
    env.insert("OPENAI_MODEL".into(), "broken-model".into());

    let response = app(env)
        .oneshot(post_json("/api/chat", r#"{"query":"What is V1?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .is_err());
}

#[tokio::test]
async fn test_pinecone_host_resolved_through_controller() {
    let (base, recorded) = spawn_upstream().await;
    let mut env = qa_env(&base);
    env.remove("PINECONE_INDEX_HOST");
    env.insert("PINECONE_CONTROLLER_URL".into(), format!("{}/", base));

    let settings = PineconeSettings::from_env(&env).unwrap();
    let store = PineconeStore::connect(test_client(), &settings).await.unwrap();
    assert_eq!(store.host(), "https://ops-proj42.svc.test-env.pinecone.io");

    let recorded = recorded.lock().unwrap();
    let (_, whoami) = recorded
        .iter()
        .find(|(p, _)| p == "/actions/whoami")
        .unwrap();
    assert_eq!(whoami["api_key"], "pc-test");
}

#[tokio::test]
async fn test_controller_failure_is_json_error() {
    let (base, recorded) = spawn_upstream().await;
    let mut env = qa_env(&base);
    env.remove("PINECONE_INDEX_HOST");
    env.insert("PINECONE_CONTROLLER_URL".into(), format!("{}/missing", base));

    let response = app(env)
        .oneshot(post_json("/api/chat", r#"{"query":"What is V1?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_message(response)
        .await
        .starts_with("pinecone controller returned HTTP 404"));
    assert!(!recorded.lock().unwrap().iter().any(|(p, _)| p == "/query"));
}

#[tokio::test]
async fn test_client_disconnect_mid_stream() {
    let (base, _) = spawn_upstream().await;
    let router = app(qa_env(&base));

    let response = router
        .clone()
        .oneshot(post_json("/api/chat", r#"{"query":"What is V1?"}"#))
        .await
        .unwrap();
    let mut frames = response.into_body().into_data_stream();
    let first = frames.next().await.unwrap().unwrap();
    assert!(!first.is_empty());
    drop(frames);

    let again = router
        .oneshot(post_json("/api/chat", r#"{"query":"What is V1?"}"#))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(body_string(again).await, "V1 is 120 knots.");
}

#[tokio::test]
async fn test_local_pipeline_streams_answer() {
    let (base, recorded) = spawn_upstream().await;
    let response = app(local_env(&base))
        .oneshot(post_json("/api/chat/local", r#"{"query":"How many vacation days?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(body_string(response).await, "25 days.");

    let recorded = recorded.lock().unwrap();
    let (_, search) = recorded
        .iter()
        .find(|(p, _)| p == "/collections/handbook/points/search")
        .unwrap();
    assert_eq!(search["limit"], 4);
    assert_eq!(search["vector"], json!([0.4, 0.5]));

    let (_, chat) = recorded.iter().find(|(p, _)| p == "/api/chat").unwrap();
    assert_eq!(chat["model"], "llama3");
    assert!(chat["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("Employees get 25 vacation days."));
}

#[tokio::test]
async fn test_local_pipeline_mid_stream_failure_aborts_body() {
    let (base, _) = spawn_upstream().await;
    let mut env = local_env(&base);
    env.insert("OLLAMA_MODEL".into(), "broken-model".into());

    let response = app(env)
        .oneshot(post_json("/api/chat/local", r#"{"query":"How many vacation days?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .is_err());
}

#[tokio::test]
async fn test_local_pipeline_missing_collection() {
    let (base, _) = spawn_upstream().await;
    let mut env = local_env(&base);
    env.remove("QDRANT_COLLECTION");

    let response = app(env)
        .oneshot(post_json("/api/chat/local", r#"{"query":"How many vacation days?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        error_message(response).await,
        "QDRANT_COLLECTION is not defined."
    );
}

#[tokio::test]
async fn test_status_reports_missing_variables() {
    let response = app(local_env("http://127.0.0.1:1"))
        .oneshot(
            Request::builder()
                .uri("/api/chat/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let status: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(status["qaChain"]["configured"], false);
    assert_eq!(status["qaChain"]["missing"][0], "OPENAI_API_KEY");
    assert_eq!(status["localPipeline"]["configured"], true);
    assert_eq!(status["localPipeline"]["missing"], json!([]));
}

#[tokio::test]
async fn test_health() {
    let response = app(HashMap::new())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, r#"{"status":"ok"}"#);
}
