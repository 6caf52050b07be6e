use domain::{FaqIndex, FaqRecord, RetrievalError};
use std::sync::Arc;
use tests::{index_of, retriever_with, sample_index, sample_records, FlakyEmbedder, HashingEmbedder};

#[tokio::test]
async fn metro_card_purchase_finds_the_card_entry() {
    let retriever = retriever_with(Arc::new(HashingEmbedder::new()), sample_index());
    let results = retriever.retrieve("metro card purchase", 3).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].entry.question, "How can I purchase a metro card?");
    assert_eq!(results[0].position, 0);
}

#[tokio::test]
async fn two_entry_store_returns_only_the_card_entry() {
    let records = vec![
        FaqRecord {
            question: "How do I buy a metro card?".into(),
            answer: "Visit any station counter.".into(),
        },
        FaqRecord {
            question: "What are metro timings?".into(),
            answer: "6 AM to 11 PM.".into(),
        },
    ];
    let embedder = HashingEmbedder::new();
    let retriever = retriever_with(Arc::new(HashingEmbedder::new()), index_of(&embedder, &records));

    let results = retriever.retrieve("metro card purchase", 1).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].position, 0);
    assert_eq!(results[0].entry.question, "How do I buy a metro card?");
    assert_eq!(results[0].entry.answer, "Visit any station counter.");
}

#[tokio::test]
async fn results_are_sorted_and_bounded_by_k() {
    let retriever = retriever_with(Arc::new(HashingEmbedder::new()), sample_index());
    for k in 1..=5 {
        let results = retriever.retrieve("how do I recharge my card", k).await.unwrap();
        assert_eq!(results.len(), k);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }
}

#[tokio::test]
async fn exact_question_ranks_first_with_full_score() {
    let records = sample_records();
    let retriever = retriever_with(Arc::new(HashingEmbedder::new()), sample_index());
    for (position, record) in records.iter().enumerate() {
        let results = retriever.retrieve(&record.question, 1).await.unwrap();
        assert_eq!(results[0].position, position, "{}", record.question);
        assert!((results[0].score - 1.0).abs() < 1e-5);
    }
}

#[tokio::test]
async fn repeated_queries_return_identical_rankings() {
    let retriever = retriever_with(Arc::new(HashingEmbedder::new()), sample_index());
    let first = retriever.retrieve("airport by metro", 4).await.unwrap();
    let second = retriever.retrieve("airport by metro", 4).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn k_larger_than_index_returns_everything() {
    let records = sample_records();
    let retriever = retriever_with(Arc::new(HashingEmbedder::new()), sample_index());
    let results = retriever.retrieve("parking", records.len() + 10).await.unwrap();
    assert_eq!(results.len(), records.len());

    let mut positions: Vec<usize> = results.iter().map(|r| r.position).collect();
    positions.sort_unstable();
    assert_eq!(positions, (0..records.len()).collect::<Vec<_>>());
}

#[tokio::test]
async fn unrelated_entries_tie_in_insertion_order() {
    let retriever = retriever_with(Arc::new(HashingEmbedder::new()), sample_index());
    let results = retriever.retrieve("parking at stations", 5).await.unwrap();

    assert_eq!(results[0].entry.question, "Is parking available at metro stations?");
    let zeros: Vec<usize> = results[1..].iter().map(|r| r.position).collect();
    assert!(results[1..].iter().all(|r| r.score == 0.0));
    assert!(zeros.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn empty_index_is_reported_before_embedding() {
    let embedder = Arc::new(HashingEmbedder::new());
    let retriever = retriever_with(embedder.clone(), FaqIndex::empty("hashing-bow"));

    let err = retriever.retrieve("metro card", 3).await.unwrap_err();
    assert_eq!(err, RetrievalError::EmptyIndex);
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn blank_query_and_zero_k_are_invalid() {
    let retriever = retriever_with(Arc::new(HashingEmbedder::new()), sample_index());
    assert!(matches!(
        retriever.retrieve("  \n\t ", 3).await,
        Err(RetrievalError::InvalidQuery(_))
    ));
    assert!(matches!(
        retriever.retrieve("metro card", 0).await,
        Err(RetrievalError::InvalidQuery(_))
    ));
}

#[tokio::test]
async fn threshold_drops_weak_matches() {
    let retriever = retriever_with(Arc::new(HashingEmbedder::new()), sample_index());
    let results = retriever
        .retrieve_with_threshold("metro card purchase", 5, Some(0.5))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].score >= 0.5);

    let none = retriever
        .retrieve_with_threshold("weather in Paris", 3, Some(0.5))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn embedder_failure_surfaces_unchanged() {
    let retriever = retriever_with(Arc::new(FlakyEmbedder::new(1)), sample_index());
    let err = retriever.retrieve("metro card", 3).await.unwrap_err();
    assert!(matches!(err, RetrievalError::EmbedderUnavailable(_)));
    assert!(retriever.retrieve("metro card", 3).await.is_ok());
}

#[tokio::test]
async fn published_index_is_seen_by_later_queries() {
    let embedder = HashingEmbedder::new();
    let records = sample_records();
    let retriever = retriever_with(Arc::new(HashingEmbedder::new()), index_of(&embedder, &records[..2]));

    let before = retriever.retrieve("airport by metro", 10).await.unwrap();
    assert_eq!(before.len(), 2);

    let held = retriever.snapshot();
    let previous = retriever.publish(index_of(&embedder, &records));
    assert_eq!(previous.len(), 2);
    assert_eq!(held.len(), 2);

    let after = retriever.retrieve("airport by metro", 1).await.unwrap();
    assert_eq!(after[0].entry.question, "How do I reach the airport by metro?");
}
