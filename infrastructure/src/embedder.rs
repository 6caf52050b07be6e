use domain::{EmbedRole, Embedder, FaqEntry, FaqRecord, RetrievalError};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::info;

const BATCH_SIZE: usize = 32;
const MAX_IN_FLIGHT: usize = 8;

/// Embeds FAQ questions for index builds. Output order matches input order.
pub struct BatchEmbedder {
    embedder: Arc<dyn Embedder>,
}

impl BatchEmbedder {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    pub async fn embed_records(&self, records: &[FaqRecord]) -> Result<Vec<FaqEntry>, RetrievalError> {
        let mut entries = Vec::with_capacity(records.len());
        for (batch_no, chunk) in records.chunks(BATCH_SIZE).enumerate() {
            info!(batch = batch_no + 1, size = chunk.len(), "embedding FAQ batch");
            entries.extend(self.embed_batch(chunk).await?);
        }
        Ok(entries)
    }

    async fn embed_batch(&self, records: &[FaqRecord]) -> Result<Vec<FaqEntry>, RetrievalError> {
        let embedder = &self.embedder;
        stream::iter(records)
            .map(|record| async move {
                let vector = embedder.embed(&record.question, EmbedRole::Passage).await?;
                Ok::<_, RetrievalError>(FaqEntry::new(
                    record.question.clone(),
                    record.answer.clone(),
                    vector,
                ))
            })
            .buffered(MAX_IN_FLIGHT)
            .try_collect()
            .await
    }
}
