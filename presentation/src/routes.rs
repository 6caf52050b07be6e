//! Request handlers and the JSON error mapping.

use crate::server::AppState;
use application::{ChatError, ChatReply, ChatRequest};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{IndexError, RankedResult, ResponderError, RetrievalError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, warn};

/// An error answered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unknown_session(id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("session '{id}' not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<RetrievalError> for ApiError {
    fn from(e: RetrievalError) -> Self {
        let status = match &e {
            RetrievalError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            RetrievalError::EmptyIndex => StatusCode::SERVICE_UNAVAILABLE,
            RetrievalError::EmbedderUnavailable(_) => StatusCode::BAD_GATEWAY,
            RetrievalError::EmbedderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            RetrievalError::DimensionMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ResponderError> for ApiError {
    fn from(e: ResponderError) -> Self {
        let status = match &e {
            ResponderError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ResponderError::Unavailable(_) => StatusCode::BAD_GATEWAY,
            ResponderError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::Retrieval(e) => e.into(),
            ChatError::Responder(e) => e.into(),
        }
    }
}

impl From<IndexError> for ApiError {
    fn from(e: IndexError) -> Self {
        let status = match &e {
            IndexError::ModelMismatch { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default = "default_memory")]
    pub memory_enabled: bool,
}

fn default_memory() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub source: &'static str,
    pub confidence: f32,
    pub session_id: String,
    pub context: Vec<domain::FaqRecord>,
}

impl From<ChatReply> for ChatResponse {
    fn from(reply: ChatReply) -> Self {
        Self {
            response: reply.response,
            source: reply.source.as_str(),
            confidence: reply.confidence,
            session_id: reply.session_id,
            context: reply.context,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub threshold: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub question: String,
    pub answer: String,
    pub score: f32,
    pub position: usize,
}

impl From<RankedResult> for SearchHit {
    fn from(result: RankedResult) -> Self {
        Self {
            question: result.entry.question,
            answer: result.entry.answer,
            score: result.score,
            position: result.position,
        }
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "DMRC FAQ assistant",
        "status": "running",
        "health": "/health",
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let entries = state.chat.retriever().snapshot().len();
    let memory = state.sessions.lock().await.stats();
    Json(json!({
        "status": "healthy",
        "llm": if state.llm_ready { "ready" } else { "not_configured" },
        "index_entries": entries,
        "embedding_model": state.embedding_model,
        "memory": memory,
    }))
}

pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, ApiError> {
    if !state.llm_ready {
        return Err(ResponderError::NotConfigured.into());
    }
    let request = ChatRequest {
        query: body.query,
        session_id: body.session_id,
        top_k: body.top_k.unwrap_or(state.default_top_k),
        threshold: body.threshold.or(state.default_threshold),
        memory_enabled: body.memory_enabled,
    };
    match state.chat.answer(&state.sessions, request).await {
        Ok(reply) => Ok(Json(reply.into())),
        Err(e) => {
            warn!(error = %e, "chat request failed");
            Err(e.into())
        }
    }
}

pub async fn search(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<Value>, ApiError> {
    let results = state
        .chat
        .search(
            &body.query,
            body.top_k.unwrap_or(state.default_top_k),
            body.threshold.or(state.default_threshold),
        )
        .await?;
    let hits: Vec<SearchHit> = results.into_iter().map(SearchHit::from).collect();
    Ok(Json(json!({ "results": hits })))
}

pub async fn session_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let memory = state.sessions.lock().await;
    let info = memory.info(&id).ok_or_else(|| ApiError::unknown_session(&id))?;
    let history = memory.recent(&id, usize::MAX);
    Ok(Json(json!({ "session": info, "history": history })))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.sessions.lock().await.delete(&id) {
        Ok(Json(json!({ "deleted": id })))
    } else {
        Err(ApiError::unknown_session(&id))
    }
}

pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.sessions.lock().await.reset(&id) {
        Ok(Json(json!({ "reset": id })))
    } else {
        Err(ApiError::unknown_session(&id))
    }
}

pub async fn update_preferences(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(preferences): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let mut memory = state.sessions.lock().await;
    if !memory.update_preferences(&id, preferences) {
        return Err(ApiError::unknown_session(&id));
    }
    Ok(Json(json!({ "session_id": id, "preferences": memory.preferences(&id) })))
}

pub async fn reload_index(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let index = state.index.clone();
    let chat = state.chat.clone();
    let entries = tokio::task::spawn_blocking(move || index.reload_into(chat.retriever()))
        .await
        .map_err(|e| {
            error!(error = %e, "index reload task failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "index reload failed")
        })??;
    Ok(Json(json!({ "status": "reloaded", "index_entries": entries })))
}
