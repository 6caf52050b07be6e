use crate::errors::{IndexError, RetrievalError};
use serde::{Deserialize, Serialize};

/// A question/answer pair as read from the FAQ source, before embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqRecord {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    pub embedding: Vec<f32>,
}

impl FaqEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            embedding,
        }
    }
}

/// The immutable FAQ store. Entry order is insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct FaqIndex {
    model: String,
    dimension: usize,
    entries: Vec<FaqEntry>,
}

impl FaqIndex {
    /// Every entry must carry a non-empty embedding of the same length.
    pub fn new(model: impl Into<String>, entries: Vec<FaqEntry>) -> Result<Self, IndexError> {
        let dimension = entries.first().map(|e| e.embedding.len()).unwrap_or(0);
        for (position, entry) in entries.iter().enumerate() {
            if entry.embedding.is_empty() {
                return Err(IndexError::EmptyEmbedding(position));
            }
            if entry.embedding.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    position,
                    expected: dimension,
                    actual: entry.embedding.len(),
                });
            }
        }
        Ok(Self {
            model: model.into(),
            dimension,
            entries,
        })
    }

    pub fn empty(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            dimension: 0,
            entries: Vec::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Zero for an empty index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A validated, trimmed user query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
}

impl Query {
    pub fn parse(raw: &str) -> Result<Self, RetrievalError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }
        Ok(Self {
            text: text.to_string(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub entry: FaqEntry,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
    /// Insertion position of the entry in the index.
    pub position: usize,
}
