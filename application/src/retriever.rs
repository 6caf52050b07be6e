use domain::{EmbedRole, Embedder, FaqIndex, Query, RankedResult, RetrievalError};
use infrastructure::search::SearchEngine;
use shared::utils::preview;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

/// Ranks FAQ entries against a query.
///
/// The index sits behind a single `Arc` that is swapped on publish: each
/// query works on the snapshot it took at the start and never observes a
/// partially replaced index.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: RwLock<Arc<FaqIndex>>,
    embed_timeout: Duration,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: FaqIndex, embed_timeout: Duration) -> Self {
        Self {
            embedder,
            index: RwLock::new(Arc::new(index)),
            embed_timeout,
        }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn snapshot(&self) -> Arc<FaqIndex> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the visible index, returning the previous one.
    pub fn publish(&self, index: FaqIndex) -> Arc<FaqIndex> {
        if !index.is_empty() && index.model() != self.embedder.model_id() {
            warn!(
                index_model = index.model(),
                embedder_model = self.embedder.model_id(),
                "publishing an index built with a different embedding model"
            );
        }
        let next = Arc::new(index);
        let mut guard = self.index.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }

    /// Top `k` entries by cosine similarity, highest first; ties keep insertion order.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RankedResult>, RetrievalError> {
        let index = self.snapshot();
        if index.is_empty() {
            return Err(RetrievalError::EmptyIndex);
        }
        let query = Query::parse(query)?;
        if k == 0 {
            return Err(RetrievalError::InvalidQuery("k must be at least 1".to_string()));
        }

        let embedding = tokio::time::timeout(
            self.embed_timeout,
            self.embedder.embed(query.text(), EmbedRole::Query),
        )
        .await
        .map_err(|_| RetrievalError::EmbedderTimeout(self.embed_timeout))??;

        if embedding.len() != index.dimension() {
            return Err(RetrievalError::DimensionMismatch {
                expected: index.dimension(),
                actual: embedding.len(),
            });
        }

        let results: Vec<RankedResult> = SearchEngine::rank(&embedding, index.entries(), k)
            .into_iter()
            .map(|scored| RankedResult {
                entry: index.entries()[scored.position].clone(),
                score: scored.score,
                position: scored.position,
            })
            .collect();

        debug!(
            query = %preview(query.text(), 50),
            returned = results.len(),
            top_score = ?results.first().map(|r| r.score),
            "retrieved FAQ candidates"
        );
        Ok(results)
    }

    /// `retrieve`, then drop results scoring below `min_score`. `None` keeps everything.
    pub async fn retrieve_with_threshold(
        &self,
        query: &str,
        k: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<RankedResult>, RetrievalError> {
        let mut results = self.retrieve(query, k).await?;
        if let Some(min_score) = min_score {
            results.retain(|r| r.score >= min_score);
        }
        Ok(results)
    }
}
