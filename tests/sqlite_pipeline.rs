//! End-to-end runs against a temporary SQLite database.
//!
//! Adapters are static so no network access is needed; everything from
//! validation onwards is the real pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use corpscrape::models::{FinancialFigures, RawArticle, RawFiling, RawPayload, RawReview};
use corpscrape::repository::create_diesel_pool;
use corpscrape::{
    DieselEntityRepository, Entity, JobContext, RawFetchResult, Scheduler, SourceAdapter,
    SourceKind,
};

async fn setup_test_db() -> (DieselEntityRepository, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let pool = create_diesel_pool(&dir.path().join("test.db")).expect("Failed to open pool");
    let repo = DieselEntityRepository::new(pool);
    repo.create_schema().await.expect("Failed to create schema");
    (repo, dir)
}

/// Serves the same filing every run with a configurable revenue.
struct StaticFilings {
    revenue: f64,
}

#[async_trait]
impl SourceAdapter for StaticFilings {
    fn kind(&self) -> SourceKind {
        SourceKind::Filings
    }

    async fn fetch(&self, _entity: &Entity) -> RawFetchResult {
        RawFetchResult::success(RawPayload::Filings(vec![
            RawFiling {
                filing_date: NaiveDate::from_ymd_opt(2023, 11, 3),
                period_end_date: NaiveDate::from_ymd_opt(2023, 9, 30),
                figures: FinancialFigures {
                    revenue: Some(self.revenue),
                    ..Default::default()
                },
                source_url: "https://www.sec.gov/doc.htm".to_string(),
            },
            // Missing dates: dropped by validation.
            RawFiling {
                filing_date: None,
                period_end_date: None,
                figures: FinancialFigures::default(),
                source_url: "https://www.sec.gov/other.htm".to_string(),
            },
        ]))
    }
}

struct StaticNews {
    title: &'static str,
}

#[async_trait]
impl SourceAdapter for StaticNews {
    fn kind(&self) -> SourceKind {
        SourceKind::News
    }

    async fn fetch(&self, entity: &Entity) -> RawFetchResult {
        RawFetchResult::success(RawPayload::News(vec![RawArticle {
            title: self.title.to_string(),
            url: format!("https://news.example.com/{}", entity.key),
            published_at: "2024-03-01T12:00:00Z".to_string(),
            source_name: "Wire".to_string(),
            sentiment: Some(0.1),
            ..Default::default()
        }]))
    }
}

struct StaticReviews;

#[async_trait]
impl SourceAdapter for StaticReviews {
    fn kind(&self) -> SourceKind {
        SourceKind::Reviews
    }

    async fn fetch(&self, _entity: &Entity) -> RawFetchResult {
        RawFetchResult::success(RawPayload::Reviews(vec![
            RawReview {
                rating: 4.0,
                review_text: Some("Solid team".to_string()),
                ..Default::default()
            },
            // Out of range: dropped by validation.
            RawReview {
                rating: 9.0,
                review_text: Some("Broken widget".to_string()),
                ..Default::default()
            },
        ]))
    }
}

fn adapters(revenue: f64, title: &'static str) -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(StaticFilings { revenue }),
        Arc::new(StaticNews { title }),
        Arc::new(StaticReviews),
    ]
}

fn companies() -> Vec<Entity> {
    vec![
        Entity::new("0000320193", "Apple Inc.").with_ticker("AAPL"),
        Entity::new("0000789019", "Microsoft Corporation").with_ticker("MSFT"),
    ]
}

#[tokio::test]
async fn batch_persists_valid_records() {
    let (repo, _dir) = setup_test_db().await;
    let ctx = JobContext::new(adapters(100.0, "First"), Arc::new(repo.clone()));

    let report = Scheduler::new(ctx.clone(), 2).run(companies()).await;

    assert_eq!(report.completed.len(), 2);
    assert_eq!(repo.count_entities().await.unwrap(), 2);
    assert_eq!(repo.review_count("Apple Inc.").await.unwrap(), 1);
    assert_eq!(repo.news_count("Microsoft Corporation").await.unwrap(), 1);

    let snapshot = ctx.metrics.snapshot();
    // One bad filing and one bad review per entity.
    assert_eq!(snapshot.validation_failures, 4);
    assert_eq!(snapshot.records_persisted, 8);
}

#[tokio::test]
async fn rerun_is_idempotent_except_reviews() {
    let (repo, _dir) = setup_test_db().await;

    let first = JobContext::new(adapters(100.0, "First"), Arc::new(repo.clone()));
    Scheduler::new(first, 2).run(companies()).await;

    let second = JobContext::new(adapters(250.0, "Second"), Arc::new(repo.clone()));
    let report = Scheduler::new(second, 2).run(companies()).await;
    assert_eq!(report.completed.len(), 2);

    assert_eq!(repo.count_entities().await.unwrap(), 2);

    let metrics = repo.financial_metrics_for("0000320193").await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].figures.revenue, Some(250.0));

    let article = repo
        .get_news_article("https://news.example.com/0000320193")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.title, "First");
    assert_eq!(repo.news_count("Apple Inc.").await.unwrap(), 1);

    assert_eq!(repo.review_count("Apple Inc.").await.unwrap(), 2);
}
