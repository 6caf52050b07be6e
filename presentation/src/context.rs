use anyhow::Context;
use application::{ChatService, ChatSettings, IndexService, IntentFilter, Retriever, SessionLimits, SessionMemory};
use domain::{Embedder, FaqIndex, IndexError, Responder};
use infrastructure::config::{Config, Provider};
use infrastructure::gemini_client::GeminiClient;
use infrastructure::ollama_client::OllamaClient;
use infrastructure::retry::RetryPolicy;
use shared::types::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a transport needs, wired from configuration.
pub struct AppContext {
    pub config: Config,
    pub retriever: Arc<Retriever>,
    pub chat: Arc<ChatService>,
    pub index: Arc<IndexService>,
    pub llm_ready: bool,
}

pub fn build_providers(config: &Config) -> Result<(Arc<dyn Embedder>, Arc<dyn Responder>, bool)> {
    match config.provider {
        Provider::Gemini => {
            let client = GeminiClient::new(config)?;
            let ready = client.is_configured();
            if !ready {
                warn!("GEMINI_API_KEY is not set; embedding and answering will fail");
            }
            let client = Arc::new(client);
            let embedder: Arc<dyn Embedder> = client.clone();
            let responder: Arc<dyn Responder> = client;
            Ok((embedder, responder, ready))
        }
        Provider::Ollama => {
            let client = Arc::new(OllamaClient::new(config)?);
            let embedder: Arc<dyn Embedder> = client.clone();
            let responder: Arc<dyn Responder> = client;
            Ok((embedder, responder, true))
        }
    }
}

impl AppContext {
    /// Wire providers and load the persisted FAQ index.
    pub fn new(config: Config) -> Result<Self> {
        let (embedder, responder, llm_ready) = build_providers(&config)?;
        let index_service = IndexService::new(embedder.clone(), config.db_path.clone());
        let index = match index_service.load_persisted() {
            Ok(index) => index,
            Err(e @ IndexError::ModelMismatch { .. }) => {
                return Err(e).context("rebuild the index with `dmrc-faq index --force`");
            }
            Err(e) => return Err(e).context("loading FAQ index"),
        };
        if index.is_empty() {
            warn!("FAQ index is empty; run `dmrc-faq index` to build it");
        }
        Ok(Self::with_parts(config, embedder, responder, llm_ready, index))
    }

    pub fn with_parts(
        config: Config,
        embedder: Arc<dyn Embedder>,
        responder: Arc<dyn Responder>,
        llm_ready: bool,
        index: FaqIndex,
    ) -> Self {
        info!(
            provider = ?config.provider,
            embedding_model = embedder.model_id(),
            llm_model = responder.model_id(),
            entries = index.len(),
            "assistant ready"
        );
        let retriever = Arc::new(Retriever::new(embedder.clone(), index, config.embed_timeout));
        let settings = ChatSettings {
            retry: RetryPolicy::new().with_max_attempts(config.max_attempts),
            respond_timeout: config.respond_timeout,
            history_turns: config.history_turns,
        };
        let chat = Arc::new(ChatService::new(
            retriever.clone(),
            responder,
            IntentFilter::new(config.intent_filter),
            settings,
        ));
        let index = Arc::new(IndexService::new(embedder, config.db_path.clone()));
        Self {
            config,
            retriever,
            chat,
            index,
            llm_ready,
        }
    }

    pub fn session_memory(&self) -> SessionMemory {
        SessionMemory::new(SessionLimits {
            max_sessions: self.config.session_max,
            ttl: self.config.session_ttl,
            max_history: 20,
        })
    }
}
