use application::{IndexService, Retriever};
use domain::{FaqIndex, IndexError};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tests::{sample_records, HashingEmbedder, SAMPLE_FAQ};

struct Workspace {
    _dir: TempDir,
    faq: PathBuf,
    db: PathBuf,
}

fn workspace(faq_json: &str) -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let faq = dir.path().join("dmrc_faq.json");
    fs::write(&faq, faq_json).unwrap();
    let db = dir.path().join("index").join("faq_index.db");
    Workspace { _dir: dir, faq, db }
}

#[tokio::test]
async fn build_persists_and_reloads_the_same_index() {
    let ws = workspace(SAMPLE_FAQ);
    let embedder = Arc::new(HashingEmbedder::new());
    let service = IndexService::new(embedder.clone(), &ws.db);

    let (built, report) = service.build_from_path(&ws.faq, false).await.unwrap();
    assert_eq!(report.entries, sample_records().len());
    assert_eq!(report.skipped, 0);
    assert_eq!(report.dimension, 256);
    assert!(!report.reused);
    assert_eq!(embedder.calls(), report.entries);

    let loaded = service.load_persisted().unwrap();
    assert_eq!(loaded, built);
    assert_eq!(service.stored_model().unwrap().as_deref(), Some("hashing-bow"));
}

#[tokio::test]
async fn unchanged_source_reuses_the_stored_index() {
    let ws = workspace(SAMPLE_FAQ);
    let embedder = Arc::new(HashingEmbedder::new());
    let service = IndexService::new(embedder.clone(), &ws.db);

    service.build_from_path(&ws.faq, false).await.unwrap();
    let calls = embedder.calls();

    let (_, report) = service.build_from_path(&ws.faq, false).await.unwrap();
    assert!(report.reused);
    assert_eq!(embedder.calls(), calls);

    let (_, forced) = service.build_from_path(&ws.faq, true).await.unwrap();
    assert!(!forced.reused);
    assert_eq!(embedder.calls(), calls * 2);
}

#[tokio::test]
async fn index_from_another_model_is_refused_on_load() {
    let ws = workspace(SAMPLE_FAQ);
    IndexService::new(Arc::new(HashingEmbedder::new()), &ws.db)
        .build_from_path(&ws.faq, false)
        .await
        .unwrap();

    let other = IndexService::new(Arc::new(HashingEmbedder::with_model("other-model")), &ws.db);
    match other.load_persisted() {
        Err(IndexError::ModelMismatch { stored, configured }) => {
            assert_eq!(stored, "hashing-bow");
            assert_eq!(configured, "other-model");
        }
        other => panic!("expected model mismatch, got {other:?}"),
    }

    let (_, report) = other.build_from_path(&ws.faq, false).await.unwrap();
    assert!(!report.reused);
    assert_eq!(other.load_persisted().unwrap().model(), "other-model");
}

#[tokio::test]
async fn missing_artifact_loads_as_empty_index() {
    let ws = workspace(SAMPLE_FAQ);
    let service = IndexService::new(Arc::new(HashingEmbedder::new()), &ws.db);
    let index = service.load_persisted().unwrap();
    assert!(index.is_empty());
}

#[tokio::test]
async fn blank_and_duplicate_entries_are_skipped() {
    let ws = workspace(
        r#"[
            {"question": "Is parking available?", "answer": "Yes, at most stations."},
            {"question": "  ", "answer": "orphan answer"},
            {"question": "is PARKING available", "answer": "duplicate"},
            {"question": "Are pets allowed?", "answer": ""}
        ]"#,
    );
    let service = IndexService::new(Arc::new(HashingEmbedder::new()), &ws.db);
    let (index, report) = service.build_from_path(&ws.faq, false).await.unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(report.skipped, 3);
}

#[tokio::test]
async fn empty_or_unsupported_sources_are_errors() {
    let ws = workspace("[]");
    let service = IndexService::new(Arc::new(HashingEmbedder::new()), &ws.db);
    assert!(matches!(
        service.build_from_path(&ws.faq, false).await,
        Err(IndexError::EmptySource)
    ));

    let csv = ws.faq.with_extension("csv");
    fs::write(&csv, "question,answer\n").unwrap();
    assert!(matches!(
        service.build_from_path(&csv, false).await,
        Err(IndexError::Source(_))
    ));
}

#[tokio::test]
async fn rebuild_publishes_into_a_live_retriever() {
    let ws = workspace(SAMPLE_FAQ);
    let embedder = Arc::new(HashingEmbedder::new());
    let retriever = Retriever::new(
        embedder.clone(),
        FaqIndex::empty("hashing-bow"),
        Duration::from_secs(5),
    );
    let service = IndexService::new(embedder, &ws.db);

    service.rebuild_and_publish(&retriever, &ws.faq, false).await.unwrap();
    let results = retriever.retrieve("metro card purchase", 1).await.unwrap();
    assert_eq!(results[0].entry.question, "How can I purchase a metro card?");

    retriever.publish(FaqIndex::empty("hashing-bow"));
    assert_eq!(service.reload_into(&retriever).unwrap(), sample_records().len());
    assert_eq!(retriever.snapshot().len(), sample_records().len());
}
