use application::{IndexService, SessionLimits, SessionMemory};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use domain::{FaqIndex, ResponderError};
use presentation::server::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tests::{chat_service, retriever_with, sample_index, HashingEmbedder, ScriptedResponder, SAMPLE_FAQ};
use tokio::sync::Mutex;
use tower::ServiceExt;

struct Harness {
    dir: TempDir,
    state: AppState,
}

impl Harness {
    fn new(index: FaqIndex, responder: ScriptedResponder, llm_ready: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(HashingEmbedder::new());
        let retriever = retriever_with(embedder.clone(), index);
        let state = AppState {
            chat: Arc::new(chat_service(retriever, Arc::new(responder))),
            index: Arc::new(IndexService::new(embedder, dir.path().join("faq_index.db"))),
            sessions: Arc::new(Mutex::new(SessionMemory::new(SessionLimits::default()))),
            llm_ready,
            embedding_model: "hashing-bow".to_string(),
            default_top_k: 3,
            default_threshold: None,
        };
        Self { dir, state }
    }

    fn ready() -> Self {
        Self::new(sample_index(), ScriptedResponder::new("Visit the customer care centre."), true)
    }

    fn router(&self) -> Router {
        build_router(self.state.clone())
    }
}

async fn send(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = router.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn root_and_health_describe_the_service() {
    let harness = Harness::ready();
    let (status, body) = send(harness.router(), Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["health"], "/health");

    let (status, body) = send(harness.router(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["llm"], "ready");
    assert_eq!(body["index_entries"], 15);
    assert_eq!(body["embedding_model"], "hashing-bow");
}

#[tokio::test]
async fn chat_answers_from_the_faq() {
    let harness = Harness::ready();
    let (status, body) = send(
        harness.router(),
        Method::POST,
        "/chat",
        Some(json!({ "query": "metro card purchase" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Visit the customer care centre.");
    assert_eq!(body["source"], "dmrc_rag");
    assert_eq!(body["context"].as_array().unwrap().len(), 3);
    assert_eq!(body["context"][0]["question"], "How can I purchase a metro card?");
    assert!(body["session_id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(body["confidence"].as_f64().unwrap() > 0.6);
}

#[tokio::test]
async fn blank_chat_query_is_a_bad_request() {
    let harness = Harness::ready();
    let (status, body) = send(harness.router(), Method::POST, "/chat", Some(json!({ "query": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid query"));
}

#[tokio::test]
async fn zero_top_k_is_a_bad_request() {
    let harness = Harness::ready();
    let (status, _) = send(
        harness.router(),
        Method::POST,
        "/search",
        Some(json!({ "query": "metro card", "top_k": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_without_a_language_model_is_unavailable() {
    let harness = Harness::new(sample_index(), ScriptedResponder::new("unused"), false);
    let (status, body) = send(harness.router(), Method::POST, "/chat", Some(json!({ "query": "metro card" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn chat_against_an_empty_index_is_unavailable() {
    let harness = Harness::new(FaqIndex::empty("hashing-bow"), ScriptedResponder::new("unused"), true);
    let (status, _) = send(harness.router(), Method::POST, "/chat", Some(json!({ "query": "metro card" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn persistent_responder_failure_is_a_bad_gateway() {
    let responder = ScriptedResponder::failing("unused", 10, ResponderError::Unavailable("503".into()));
    let harness = Harness::new(sample_index(), responder, true);
    let (status, _) = send(harness.router(), Method::POST, "/chat", Some(json!({ "query": "metro card" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn search_returns_ranked_hits() {
    let harness = Harness::ready();
    let (status, body) = send(
        harness.router(),
        Method::POST,
        "/search",
        Some(json!({ "query": "airport by metro", "top_k": 2 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["question"], "How do I reach the airport by metro?");
    assert_eq!(results[0]["position"], 14);
    assert!(results[0]["score"].as_f64().unwrap() >= results[1]["score"].as_f64().unwrap());
}

#[tokio::test]
async fn session_lifecycle() {
    let harness = Harness::ready();
    let (_, reply) = send(
        harness.router(),
        Method::POST,
        "/chat",
        Some(json!({ "query": "metro card purchase", "session_id": "rider-1" })),
    )
    .await;
    assert_eq!(reply["session_id"], "rider-1");

    let (status, body) = send(harness.router(), Method::GET, "/sessions/rider-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["total_conversations"], 1);
    assert_eq!(body["history"][0]["user_query"], "metro card purchase");

    let (status, body) = send(
        harness.router(),
        Method::PUT,
        "/sessions/rider-1/preferences",
        Some(json!({ "language": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["preferences"]["language"], "hi");

    let (status, _) = send(harness.router(), Method::POST, "/sessions/rider-1/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(harness.router(), Method::GET, "/sessions/rider-1", None).await;
    assert_eq!(body["session"]["total_conversations"], 0);
    assert_eq!(body["session"]["preferences"]["language"], "hi");

    let (status, _) = send(harness.router(), Method::DELETE, "/sessions/rider-1", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(harness.router(), Method::GET, "/sessions/rider-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("rider-1"));
}

#[tokio::test]
async fn unknown_sessions_are_not_found() {
    let harness = Harness::ready();
    for (method, uri) in [
        (Method::DELETE, "/sessions/ghost"),
        (Method::POST, "/sessions/ghost/reset"),
    ] {
        let (status, _) = send(harness.router(), method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (status, _) = send(
        harness.router(),
        Method::PUT,
        "/sessions/ghost/preferences",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_publishes_the_persisted_index() {
    let harness = Harness::new(FaqIndex::empty("hashing-bow"), ScriptedResponder::new("ok"), true);
    let faq = harness.dir.path().join("dmrc_faq.json");
    std::fs::write(&faq, SAMPLE_FAQ).unwrap();
    harness.state.index.build_from_path(&faq, false).await.unwrap();

    let (status, _) = send(harness.router(), Method::POST, "/search", Some(json!({ "query": "metro card" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(harness.router(), Method::POST, "/index/reload", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["index_entries"], 15);

    let (status, body) = send(harness.router(), Method::POST, "/search", Some(json!({ "query": "metro card" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 3);
}
