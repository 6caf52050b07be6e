use crate::errors::{ResponderError, RetrievalError};
use async_trait::async_trait;

/// Which side of the retrieval pair a text is embedded for.
/// Asymmetric models encode questions and stored passages differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedRole {
    Query,
    Passage,
}

impl EmbedRole {
    /// e5-style instruction prefix.
    pub fn prefix(self) -> &'static str {
        match self {
            EmbedRole::Query => "query: ",
            EmbedRole::Passage => "passage: ",
        }
    }
}

/// Text to fixed-length vector. Deterministic for a given model version.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier persisted alongside the index to detect model changes.
    fn model_id(&self) -> &str;

    async fn embed(&self, text: &str, role: EmbedRole) -> Result<Vec<f32>, RetrievalError>;
}

/// Prompt to final answer text.
#[async_trait]
pub trait Responder: Send + Sync {
    fn model_id(&self) -> &str;

    async fn respond(&self, prompt: &str) -> Result<String, ResponderError>;
}
