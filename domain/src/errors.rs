use std::time::Duration;
use thiserror::Error;

/// Failures of the retrieval step. These surface to the caller unmodified.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RetrievalError {
    #[error("no FAQ data is loaded")]
    EmptyIndex,
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("embedding service unavailable: {0}")]
    EmbedderUnavailable(String),
    #[error("embedding service did not answer within {0:?}")]
    EmbedderTimeout(Duration),
    #[error("embedding dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl RetrievalError {
    /// Transient embedder failures; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetrievalError::EmbedderUnavailable(_) | RetrievalError::EmbedderTimeout(_)
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResponderError {
    #[error("language model unavailable: {0}")]
    Unavailable(String),
    #[error("language model did not answer within {0:?}")]
    Timeout(Duration),
    #[error("language model is not configured")]
    NotConfigured,
}

impl ResponderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResponderError::Unavailable(_) | ResponderError::Timeout(_))
    }
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("FAQ source error: {0}")]
    Source(String),
    #[error("FAQ source contains no usable entries")]
    EmptySource,
    #[error("FAQ store error: {0}")]
    Storage(String),
    #[error("stored index was built with '{stored}' but the configured embedding model is '{configured}'")]
    ModelMismatch { stored: String, configured: String },
    #[error("entry {position} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },
    #[error("entry {0} has an empty embedding")]
    EmptyEmbedding(usize),
    #[error("embedding failed: {0}")]
    Embedding(#[from] RetrievalError),
}
