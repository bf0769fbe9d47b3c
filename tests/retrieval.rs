mod common;

use std::sync::Arc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use common::{Fault, FaultyEmbedder, KeywordEmbedder};
use coursedex::{CourseRecord, Error, HashingEmbedder, QueryError, RetrievalService};

fn llm_records() -> Vec<CourseRecord> {
    vec![
        CourseRecord::new("rec-intro", "Intro to LLMs", "basics"),
        CourseRecord::new("rec-adv", "Advanced LLMs", "deep dive"),
    ]
}

const WORDS: &[&str] = &[
    "python", "pandas", "statistics", "regression", "neural", "network", "vision", "language",
    "model", "prompt", "agent", "cloud", "sql", "tableau", "excel", "bayesian", "forecast",
    "cluster", "tree", "boosting", "transformer", "embedding", "retrieval", "career",
];

fn random_records(n: usize, seed: u64) -> Vec<CourseRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let mut pick = |count: usize| {
                WORDS.choose_multiple(&mut rng, count).copied().collect::<Vec<_>>()
            };
            let title = pick(3).join(" ");
            let description = pick(6).join(" ");
            let lessons = pick(4);
            CourseRecord::new(format!("course-{i}"), title, description).with_chapter("Module 1", lessons)
        })
        .collect()
}

#[tokio::test]
async fn closest_course_ranks_first() {
    let service = RetrievalService::new(Arc::new(KeywordEmbedder::new()));
    service.build(llm_records()).await.unwrap();

    let hits = service.query("LLM basics", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].record_id, "rec-intro");
    assert_eq!(service.record(&hits[0].record_id).unwrap().title, "Intro to LLMs");

    let both = service.query("LLM basics", 2).await.unwrap();
    assert!(both[0].distance < both[1].distance);
    assert_eq!(both[1].record_id, "rec-adv");
}

#[tokio::test]
async fn k_beyond_size_returns_every_entry_in_order() {
    let service = RetrievalService::new(Arc::new(HashingEmbedder::new(128).unwrap()));
    service.build(random_records(7, 1)).await.unwrap();

    let hits = service.query("python regression", 50).await.unwrap();
    assert_eq!(hits.len(), 7);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert!(hits.iter().all(|h| h.distance >= 0.0));
}

#[tokio::test]
async fn empty_index_queries_return_empty() {
    let provider = Arc::new(FaultyEmbedder::new(32));
    let service = RetrievalService::new(provider.clone());
    assert!(service.query("anything", 5).await.unwrap().is_empty());
    // Nothing to search, so the provider is never asked
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn persisted_index_searches_identically() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(HashingEmbedder::new(96).unwrap());

    let original = RetrievalService::new(provider.clone());
    original.build(random_records(60, 7)).await.unwrap();
    original.persist(dir.path()).unwrap();

    let restored = RetrievalService::load(provider, dir.path()).unwrap();
    assert_eq!(restored.len(), 60);

    for query in ["python pandas", "neural network vision", "career", "", "sql excel tableau forecast"] {
        let before = original.query(query, 10).await.unwrap();
        let after = restored.query(query, 10).await.unwrap();
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b.record_id, a.record_id, "query {query:?}");
            assert!((b.distance - a.distance).abs() <= 1e-6);
        }
    }
    assert_eq!(restored.record("course-3"), original.record("course-3"));
}

#[tokio::test]
async fn reload_with_other_dimension_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let service = RetrievalService::new(Arc::new(HashingEmbedder::new(64).unwrap()));
    service.build(random_records(3, 2)).await.unwrap();
    service.persist(dir.path()).unwrap();

    let err = RetrievalService::load(Arc::new(HashingEmbedder::new(32).unwrap()), dir.path()).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 64, actual: 32 }));
}

#[tokio::test]
async fn reload_with_other_model_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let service = RetrievalService::new(Arc::new(HashingEmbedder::new(6).unwrap()));
    service.build(llm_records()).await.unwrap();
    service.persist(dir.path()).unwrap();

    let err = RetrievalService::load(Arc::new(KeywordEmbedder::new()), dir.path()).unwrap_err();
    assert!(matches!(err, Error::InconsistentIndexState(_)));
}

#[tokio::test]
async fn failed_build_keeps_previous_index() {
    let provider = Arc::new(FaultyEmbedder::failing_after(64, 5, Fault::Down));
    let service = RetrievalService::new(provider.clone());
    service.build(random_records(3, 3)).await.unwrap();

    let err = service.build(random_records(10, 4)).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(!err.is_rate_limited());
    assert_eq!(service.len(), 3);
    assert!(service.record("course-2").is_some());
}

#[tokio::test]
async fn rate_limit_during_build_is_reported_as_such() {
    let provider = Arc::new(FaultyEmbedder::failing_after(64, 1, Fault::RateLimited));
    let service = RetrievalService::new(provider);
    let err = service.build(random_records(4, 5)).await.unwrap_err();
    assert!(err.is_rate_limited());
    assert!(service.is_empty());
}

#[tokio::test]
async fn query_failures_are_classified_and_isolated() {
    let provider = Arc::new(FaultyEmbedder::new(64));
    let service = RetrievalService::new(provider.clone());
    service.build(random_records(5, 6)).await.unwrap();
    let healthy = service.query("python", 3).await.unwrap();

    provider.set_fault(Fault::RateLimited);
    let err = service.query("python", 3).await.unwrap_err();
    assert!(matches!(err, QueryError::RateLimited));
    assert!(err.is_try_again_later());

    provider.set_fault(Fault::Down);
    let err = service.query("python", 3).await.unwrap_err();
    assert!(matches!(err, QueryError::Unavailable(_)));

    provider.set_fault(Fault::Reject);
    let err = service.query("python", 3).await.unwrap_err();
    assert!(matches!(err, QueryError::Failed(Error::InvalidInput(_))));
    assert!(!err.is_try_again_later());

    provider.set_fault(Fault::None);
    assert_eq!(service.query("python", 3).await.unwrap(), healthy);
    assert_eq!(service.len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queries_agree_with_sequential_ones() {
    let service = Arc::new(RetrievalService::new(Arc::new(HashingEmbedder::new(128).unwrap())));
    service.build(random_records(40, 8)).await.unwrap();

    let queries = ["python", "vision transformer", "sql", "agent prompt", "bayesian forecast"];
    let mut expected = Vec::new();
    for q in queries {
        expected.push(service.query(q, 5).await.unwrap());
    }

    let mut handles = Vec::new();
    for round in 0..8 {
        for (i, q) in queries.iter().enumerate() {
            let service = service.clone();
            let q = q.to_string();
            handles.push(tokio::spawn(async move { (round, i, service.query(&q, 5).await) }));
        }
    }
    for handle in handles {
        let (_, i, result) = handle.await.unwrap();
        assert_eq!(result.unwrap(), expected[i]);
    }
}
