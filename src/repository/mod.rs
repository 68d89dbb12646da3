//! Persistence layer.
//!
//! SQLite via sync Diesel and r2d2; every call runs on the blocking pool.

pub mod diesel_entity;
pub mod diesel_models;
pub mod diesel_pool;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

pub use diesel_entity::DieselEntityRepository;
pub use diesel_pool::{create_diesel_pool, create_diesel_pool_from_url, run_blocking, SqlitePool};

use crate::models::EntityRecord;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query, pool and blocking-task failures alike.
    #[error("Database error: {0}")]
    Database(#[from] diesel_pool::DieselError),
}

/// Rows written by one save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub entities: usize,
    pub financial_metrics: usize,
    /// New articles only; URLs already stored are skipped.
    pub news_articles: usize,
    pub employee_reviews: usize,
}

impl SaveSummary {
    pub fn total(&self) -> usize {
        self.entities + self.financial_metrics + self.news_articles + self.employee_reviews
    }
}

/// Capability: persist one entity's aggregate atomically.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Save everything in `record` in one transaction. On error nothing is
    /// written.
    async fn save(&self, record: &EntityRecord) -> Result<SaveSummary, StoreError>;
}

// ============================================================================
// Text column helpers
// ============================================================================

const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored date, falling back to the epoch for malformed values.
pub(crate) fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap_or_default()
}

/// Parse a stored RFC 3339 timestamp, falling back to now.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
