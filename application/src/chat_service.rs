use crate::intent_filter::IntentFilter;
use crate::prompts::{build_persona_prompt, build_rag_prompt};
use crate::retriever::Retriever;
use crate::session_memory::SessionMemory;
use domain::session::ConversationEntry;
use domain::{FaqRecord, Query, RankedResult, Responder, ResponderError, RetrievalError};
use infrastructure::retry::{retry_async, RetryPolicy};
use serde::Serialize;
use serde_json::{json, Map, Value};
use shared::utils::preview;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

pub const NO_MATCH_REPLY: &str =
    "I couldn't find specific information about that. Please rephrase or ask about Delhi Metro services.";

const GENERAL_CONFIDENCE: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    DmrcRag,
    MetroGeneral,
    NoMatches,
}

impl AnswerSource {
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerSource::DmrcRag => "dmrc_rag",
            AnswerSource::MetroGeneral => "metro_general",
            AnswerSource::NoMatches => "no_matches",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub query: String,
    pub session_id: Option<String>,
    pub top_k: usize,
    pub threshold: Option<f32>,
    pub memory_enabled: bool,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            session_id: None,
            top_k: 3,
            threshold: None,
            memory_enabled: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    pub source: AnswerSource,
    pub confidence: f32,
    pub session_id: String,
    pub context: Vec<FaqRecord>,
    pub results: Vec<RankedResult>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChatError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Responder(#[from] ResponderError),
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub retry: RetryPolicy,
    pub respond_timeout: Duration,
    pub history_turns: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            respond_timeout: Duration::from_secs(30),
            history_turns: 3,
        }
    }
}

/// Routes a query through intent detection, retrieval and the language model,
/// retrying transient failures of the external services.
pub struct ChatService {
    retriever: Arc<Retriever>,
    responder: Arc<dyn Responder>,
    intent: IntentFilter,
    settings: ChatSettings,
}

impl ChatService {
    pub fn new(
        retriever: Arc<Retriever>,
        responder: Arc<dyn Responder>,
        intent: IntentFilter,
        settings: ChatSettings,
    ) -> Self {
        Self {
            retriever,
            responder,
            intent,
            settings,
        }
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    /// Ranked FAQ matches with the same retry treatment as a chat turn.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<RankedResult>, RetrievalError> {
        retry_async(
            &self.settings.retry,
            "embed",
            RetrievalError::is_retryable,
            || self.retriever.retrieve_with_threshold(query, top_k, threshold),
        )
        .await
    }

    pub async fn answer(
        &self,
        memory: &Mutex<SessionMemory>,
        request: ChatRequest,
    ) -> Result<ChatReply, ChatError> {
        let query = Query::parse(&request.query)?;

        let (session_id, history) = {
            let mut memory = memory.lock().await;
            let session_id = memory.create_session(request.session_id.clone());
            let history = if request.memory_enabled {
                memory.conversation_context(&session_id, self.settings.history_turns)
            } else {
                String::new()
            };
            (session_id, history)
        };

        let reply = if self.intent.is_dmrc_query(query.text()) {
            self.answer_from_faq(&query, &request, &history, session_id)
                .await?
        } else {
            let prompt = build_persona_prompt(query.text(), &history);
            let response = self.respond(&prompt).await?;
            ChatReply {
                response,
                source: AnswerSource::MetroGeneral,
                confidence: GENERAL_CONFIDENCE,
                session_id,
                context: Vec::new(),
                results: Vec::new(),
            }
        };

        info!(
            session_id = %reply.session_id,
            source = reply.source.as_str(),
            context = reply.context.len(),
            query = %preview(query.text(), 50),
            "answered query"
        );

        if request.memory_enabled {
            let entry = ConversationEntry::new(
                query.text(),
                reply.response.clone(),
                reply.source.as_str(),
                reply.confidence,
            )
            .with_context(reply.context.clone())
            .with_metadata(request_metadata(&request));
            memory.lock().await.record(&reply.session_id, entry);
        }
        Ok(reply)
    }

    async fn answer_from_faq(
        &self,
        query: &Query,
        request: &ChatRequest,
        history: &str,
        session_id: String,
    ) -> Result<ChatReply, ChatError> {
        let results = self
            .search(query.text(), request.top_k, request.threshold)
            .await?;
        if results.is_empty() {
            return Ok(ChatReply {
                response: NO_MATCH_REPLY.to_string(),
                source: AnswerSource::NoMatches,
                confidence: 0.0,
                session_id,
                context: Vec::new(),
                results,
            });
        }

        let context: Vec<FaqRecord> = results
            .iter()
            .map(|r| FaqRecord {
                question: r.entry.question.clone(),
                answer: r.entry.answer.clone(),
            })
            .collect();
        let prompt = build_rag_prompt(query.text(), &context, history);
        let response = self.respond(&prompt).await?;
        Ok(ChatReply {
            response,
            source: AnswerSource::DmrcRag,
            confidence: results[0].score.clamp(0.0, 1.0),
            session_id,
            context,
            results,
        })
    }

    async fn respond(&self, prompt: &str) -> Result<String, ResponderError> {
        let timeout = self.settings.respond_timeout;
        retry_async(
            &self.settings.retry,
            "respond",
            ResponderError::is_retryable,
            || async move {
                tokio::time::timeout(timeout, self.responder.respond(prompt))
                    .await
                    .map_err(|_| ResponderError::Timeout(timeout))?
            },
        )
        .await
    }
}

fn request_metadata(request: &ChatRequest) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("top_k".into(), json!(request.top_k));
    metadata.insert("threshold".into(), json!(request.threshold));
    metadata.insert("memory_enabled".into(), json!(request.memory_enabled));
    metadata
}
