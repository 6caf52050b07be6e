//! HTTP server for the FAQ assistant.

use crate::context::AppContext;
use application::{ChatService, IndexService, SessionMemory};
use axum::{
    routing::{get, post, put},
    Router,
};
use shared::types::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub index: Arc<IndexService>,
    pub sessions: Arc<Mutex<SessionMemory>>,
    pub llm_ready: bool,
    pub embedding_model: String,
    pub default_top_k: usize,
    pub default_threshold: Option<f32>,
}

impl AppState {
    pub fn from_context(ctx: &AppContext) -> Self {
        Self {
            chat: ctx.chat.clone(),
            index: ctx.index.clone(),
            sessions: Arc::new(Mutex::new(ctx.session_memory())),
            llm_ready: ctx.llm_ready,
            embedding_model: ctx.retriever.embedder().model_id().to_string(),
            default_top_k: ctx.config.top_k,
            default_threshold: ctx.config.similarity_threshold,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(crate::routes::root))
        .route("/health", get(crate::routes::health))
        .route("/chat", post(crate::routes::chat))
        .route("/search", post(crate::routes::search))
        .route(
            "/sessions/{id}",
            get(crate::routes::session_info).delete(crate::routes::delete_session),
        )
        .route("/sessions/{id}/reset", post(crate::routes::reset_session))
        .route("/sessions/{id}/preferences", put(crate::routes::update_preferences))
        .route("/index/reload", post(crate::routes::reload_index))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
