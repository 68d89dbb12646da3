//! Concurrent, rate-limited collection of company data.
//!
//! For each entity (company) the pipeline fetches SEC filings, news articles
//! and employee reviews, validates every record and saves the lot in one
//! SQLite transaction. See [`scheduler::Scheduler`] for the entry point.

pub mod config;
pub mod entities;
pub mod job;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod schema;
pub mod scheduler;
pub mod scrapers;
pub mod validate;

pub use config::Settings;
pub use job::{EntityJob, JobContext, JobError, JobState};
pub use metrics::{Metrics, MetricsSnapshot};
pub use models::{Entity, EntityRecord, RawFetchResult, SourceKind};
pub use repository::{DieselEntityRepository, EntityStore, SaveSummary, StoreError};
pub use scheduler::{BatchReport, Scheduler, StopSignal};
pub use scrapers::{SourceAdapter, SourceFailure};
