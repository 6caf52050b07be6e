use crate::retriever::Retriever;
use domain::{Embedder, FaqIndex, IndexError};
use infrastructure::embedder::BatchEmbedder;
use infrastructure::faq_source::{load_faq_source, FaqSource};
use infrastructure::faq_store::FaqStore;
use serde::Serialize;
use shared::telemetry::Telemetry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexReport {
    pub entries: usize,
    pub skipped: usize,
    pub dimension: usize,
    pub model: String,
    pub source_hash: String,
    /// True when the persisted index matched the source and nothing was re-embedded.
    pub reused: bool,
}

fn storage_err(e: anyhow::Error) -> IndexError {
    IndexError::Storage(format!("{e:#}"))
}

/// Builds, persists and reloads the FAQ index.
pub struct IndexService {
    embedder: Arc<dyn Embedder>,
    db_path: PathBuf,
}

impl IndexService {
    pub fn new(embedder: Arc<dyn Embedder>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            embedder,
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open_store(&self) -> Result<FaqStore, IndexError> {
        FaqStore::new(&self.db_path).map_err(storage_err)
    }

    /// Embedding model recorded in the persisted artifact, if any.
    pub fn stored_model(&self) -> Result<Option<String>, IndexError> {
        Ok(self
            .open_store()?
            .meta()
            .map_err(storage_err)?
            .map(|m| m.embedding_model))
    }

    /// Load the persisted index. A missing artifact yields an empty index;
    /// an artifact built with another embedding model is refused.
    pub fn load_persisted(&self) -> Result<FaqIndex, IndexError> {
        let store = self.open_store()?;
        let Some((index, meta)) = store.load_index().map_err(storage_err)? else {
            info!(db = %self.db_path.display(), "no persisted FAQ index found");
            return Ok(FaqIndex::empty(self.embedder.model_id()));
        };
        if meta.embedding_model != self.embedder.model_id() {
            return Err(IndexError::ModelMismatch {
                stored: meta.embedding_model,
                configured: self.embedder.model_id().to_string(),
            });
        }
        info!(
            entries = index.len(),
            dimension = index.dimension(),
            model = index.model(),
            built_at = %meta.built_at,
            "loaded FAQ index"
        );
        Ok(index)
    }

    pub async fn build_from_path(
        &self,
        faq_path: impl AsRef<Path>,
        force: bool,
    ) -> Result<(FaqIndex, IndexReport), IndexError> {
        let source = load_faq_source(faq_path).map_err(|e| IndexError::Source(format!("{e:#}")))?;
        self.build(source, force).await
    }

    /// Embed and persist `source`, unless the stored artifact already matches
    /// both the source digest and the embedding model.
    pub async fn build(&self, source: FaqSource, force: bool) -> Result<(FaqIndex, IndexReport), IndexError> {
        if source.records.is_empty() {
            return Err(IndexError::EmptySource);
        }
        let model = self.embedder.model_id().to_string();
        let store = self.open_store()?;

        if !force {
            if let Some(meta) = store.meta().map_err(storage_err)? {
                if meta.source_hash == source.hash && meta.embedding_model == model {
                    if let Some((index, _)) = store.load_index().map_err(storage_err)? {
                        info!(entries = index.len(), "FAQ source unchanged, reusing stored index");
                        let report = IndexReport {
                            entries: index.len(),
                            skipped: source.skipped,
                            dimension: index.dimension(),
                            model,
                            source_hash: source.hash,
                            reused: true,
                        };
                        return Ok((index, report));
                    }
                }
            }
        }

        let timer = Telemetry::new();
        let entries = BatchEmbedder::new(self.embedder.clone())
            .embed_records(&source.records)
            .await?;
        let index = FaqIndex::new(model.clone(), entries)?;
        store
            .replace_index(&index, &source.hash)
            .map_err(storage_err)?;
        info!(
            entries = index.len(),
            dimension = index.dimension(),
            elapsed_ms = timer.elapsed_ms() as u64,
            "built FAQ index"
        );

        let report = IndexReport {
            entries: index.len(),
            skipped: source.skipped,
            dimension: index.dimension(),
            model,
            source_hash: source.hash,
            reused: false,
        };
        Ok((index, report))
    }

    /// Build off to the side, then publish in one step.
    pub async fn rebuild_and_publish(
        &self,
        retriever: &Retriever,
        faq_path: impl AsRef<Path>,
        force: bool,
    ) -> Result<IndexReport, IndexError> {
        let (index, report) = self.build_from_path(faq_path, force).await?;
        retriever.publish(index);
        Ok(report)
    }

    /// Re-read the persisted artifact and publish it. Returns the entry count.
    pub fn reload_into(&self, retriever: &Retriever) -> Result<usize, IndexError> {
        let index = self.load_persisted()?;
        let entries = index.len();
        retriever.publish(index);
        Ok(entries)
    }
}
