//! Batch-level behavior of the scheduler with mock adapters and stores.
//!
//! Verifies failure isolation between entities and the concurrency bound.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use corpscrape::models::{RawArticle, RawPayload};
use corpscrape::{
    Entity, EntityRecord, EntityStore, JobContext, JobError, Metrics, RawFetchResult, SaveSummary,
    Scheduler, SourceAdapter, SourceFailure, SourceKind, StopSignal, StoreError,
};

fn entities(n: usize) -> Vec<Entity> {
    (1..=n)
        .map(|i| Entity::new(format!("{i:010}"), format!("Company {i}")))
        .collect()
}

fn article(entity: &Entity) -> RawArticle {
    RawArticle {
        title: format!("{} news", entity.display_name),
        url: format!("https://example.com/{}", entity.key),
        published_at: "2024-03-01T12:00:00Z".to_string(),
        source_name: "Wire".to_string(),
        ..Default::default()
    }
}

/// Returns one article per entity, failing for a chosen key.
struct NewsFailingFor(Option<&'static str>);

#[async_trait]
impl SourceAdapter for NewsFailingFor {
    fn kind(&self) -> SourceKind {
        SourceKind::News
    }

    async fn fetch(&self, entity: &Entity) -> RawFetchResult {
        if Some(entity.key.as_str()) == self.0 {
            return RawFetchResult::failed(
                SourceKind::News,
                SourceFailure::Status {
                    status: 503,
                    url: "https://news.example.com".to_string(),
                },
            );
        }
        RawFetchResult::success(RawPayload::News(vec![article(entity)]))
    }
}

/// Sleeps for a fixed time and tracks how many calls overlap.
struct SlowAdapter {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowAdapter {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SourceAdapter for SlowAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Reviews
    }

    async fn fetch(&self, _entity: &Entity) -> RawFetchResult {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        RawFetchResult::success(RawPayload::Reviews(Vec::new()))
    }
}

/// In-memory store that can be told to fail for one key.
#[derive(Default)]
struct MemoryStore {
    fail_for: Option<&'static str>,
    saved: Mutex<Vec<String>>,
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn save(&self, record: &EntityRecord) -> Result<SaveSummary, StoreError> {
        if Some(record.entity.key.as_str()) == self.fail_for {
            return Err(StoreError::Database(
                diesel::result::Error::RollbackTransaction,
            ));
        }
        self.saved.lock().unwrap().push(record.entity.key.clone());
        Ok(SaveSummary {
            entities: 1,
            news_articles: record.news_articles.len(),
            ..Default::default()
        })
    }
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test]
async fn persistence_failure_fails_only_that_entity() {
    let store = Arc::new(MemoryStore {
        fail_for: Some("0000000003"),
        ..Default::default()
    });
    let metrics = Metrics::new();
    let ctx = JobContext::new(vec![Arc::new(NewsFailingFor(None))], store.clone())
        .with_metrics(metrics.clone());

    let report = Scheduler::new(ctx, 3).run(entities(5)).await;

    assert_eq!(report.completed.len(), 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].entity.key, "0000000003");
    assert!(matches!(report.failed[0].error, JobError::Persistence(_)));
    assert_eq!(store.saved.lock().unwrap().len(), 4);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.entities_completed, 4);
    assert_eq!(snapshot.entities_failed, 1);
}

#[tokio::test]
async fn adapter_failure_still_completes_the_entity() {
    let store = Arc::new(MemoryStore::default());
    let metrics = Metrics::new();
    let ctx = JobContext::new(
        vec![Arc::new(NewsFailingFor(Some("0000000003")))],
        store.clone(),
    )
    .with_metrics(metrics.clone());

    let report = Scheduler::new(ctx, 3).run(entities(5)).await;

    assert_eq!(report.completed.len(), 5);
    assert!(report.failed.is_empty());

    let third = report
        .completed
        .iter()
        .find(|r| r.entity.key == "0000000003")
        .unwrap();
    assert!(third.news_articles.is_empty());
    let others: usize = report
        .completed
        .iter()
        .map(|r| r.news_articles.len())
        .sum();
    assert_eq!(others, 4);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.total_source_calls, 5);
    assert_eq!(snapshot.failed_source_calls, 1);
    assert!((snapshot.success_rate - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn invalid_entity_is_reported_not_fetched() {
    let store = Arc::new(MemoryStore::default());
    let ctx = JobContext::new(vec![Arc::new(NewsFailingFor(None))], store.clone());

    let mut list = entities(2);
    list.push(Entity::new("123456789", "Nine Digit Corp"));

    let report = Scheduler::new(ctx.clone(), 2).run(list).await;

    assert_eq!(report.completed.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].error, JobError::InvalidEntity(_)));
    assert_eq!(ctx.metrics.snapshot().total_source_calls, 2);
}

// ============================================================================
// Concurrency bound
// ============================================================================

#[tokio::test(start_paused = true)]
async fn at_most_bound_jobs_in_flight() {
    let delay = Duration::from_secs(1);
    let adapter = Arc::new(SlowAdapter::new(delay));
    let ctx = JobContext::new(vec![adapter.clone()], Arc::new(MemoryStore::default()));

    let start = Instant::now();
    let report = Scheduler::new(ctx, 3).run(entities(10)).await;
    let elapsed = start.elapsed();

    assert_eq!(report.completed.len(), 10);
    assert!(adapter.max_in_flight.load(Ordering::SeqCst) <= 3);
    assert_eq!(adapter.max_in_flight.load(Ordering::SeqCst), 3);
    // ceil(10 / 3) waves of one delay each.
    assert!(elapsed >= delay * 4, "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn stop_signal_skips_unstarted_entities() {
    let delay = Duration::from_secs(10);
    let adapter = Arc::new(SlowAdapter::new(delay));
    let ctx = JobContext::new(vec![adapter], Arc::new(MemoryStore::default()));

    let stop = StopSignal::new();
    let scheduler = Scheduler::new(ctx, 2).with_stop_signal(stop.clone());

    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        stop.stop();
    });

    let report = scheduler.run(entities(6)).await;
    trigger.await.unwrap();

    // The first two were already running and finish normally.
    assert_eq!(report.completed.len(), 2);
    assert_eq!(report.skipped.len(), 4);
    assert!(report.failed.is_empty());
}
