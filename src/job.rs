//! Per-entity orchestration.
//!
//! A job fetches from every adapter in turn, validates what came back and
//! persists the aggregate in one transaction. A failing adapter only costs its
//! own records; only an invalid entity or a failed save fails the job.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metrics::Metrics;
use crate::models::{Entity, EntityRecord, RawFetchResult};
use crate::repository::{EntityStore, StoreError};
use crate::scrapers::{SourceAdapter, SourceFailure};
use crate::validate::{self, ValidationError};

/// Default bound on a single adapter call.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid entity: {0}")]
    InvalidEntity(#[from] ValidationError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("Job aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Fetching,
    Validating,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Fetching => "fetching",
            JobState::Validating => "validating",
            JobState::Persisting => "persisting",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything a job needs besides its entity. Cheap to clone.
#[derive(Clone)]
pub struct JobContext {
    pub adapters: Vec<Arc<dyn SourceAdapter>>,
    pub store: Arc<dyn EntityStore>,
    pub metrics: Metrics,
    pub fetch_timeout: Duration,
}

impl JobContext {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, store: Arc<dyn EntityStore>) -> Self {
        Self {
            adapters,
            store,
            metrics: Metrics::new(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

/// One entity's run through the pipeline.
#[derive(Debug)]
pub struct EntityJob {
    entity: Entity,
    state: JobState,
}

impl EntityJob {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            state: JobState::Fetching,
        }
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn transition(&mut self, state: JobState) {
        debug!(entity = %self.entity.key, from = %self.state, to = %state, "Job state");
        self.state = state;
    }

    /// Run the job to completion and return the persisted aggregate.
    pub async fn run(&mut self, ctx: &JobContext) -> Result<EntityRecord, JobError> {
        let result = self.run_inner(ctx).await;
        match &result {
            Ok(record) => {
                self.transition(JobState::Done);
                ctx.metrics.record_entity(true);
                info!(
                    entity = %self.entity.key,
                    name = %self.entity.display_name,
                    metrics = record.financial_metrics.len(),
                    news = record.news_articles.len(),
                    reviews = record.employee_reviews.len(),
                    "Entity completed"
                );
            }
            Err(e) => {
                self.transition(JobState::Failed);
                ctx.metrics.record_entity(false);
                warn!(entity = %self.entity.key, error = %e, "Entity failed");
            }
        }
        result
    }

    async fn run_inner(&mut self, ctx: &JobContext) -> Result<EntityRecord, JobError> {
        validate::validate_entity(&self.entity)?;
        info!(entity = %self.entity.key, name = %self.entity.display_name, "Entity started");

        let mut raw_results = Vec::with_capacity(ctx.adapters.len());
        for adapter in &ctx.adapters {
            raw_results.push(self.fetch_one(adapter.as_ref(), ctx).await);
        }

        self.transition(JobState::Validating);
        let mut record = EntityRecord::new(self.entity.clone());
        for raw in &raw_results {
            let validated = validate::validate(&self.entity, raw);
            if !validated.failures.is_empty() {
                warn!(
                    entity = %self.entity.key,
                    source = %raw.source,
                    dropped = validated.failures.len(),
                    first_error = %validated.failures[0],
                    "Dropped invalid records"
                );
                ctx.metrics
                    .record_validation_failures(validated.failures.len());
            }
            record.financial_metrics.extend(validated.financial_metrics);
            record.news_articles.extend(validated.news_articles);
            record.employee_reviews.extend(validated.employee_reviews);
        }

        self.transition(JobState::Persisting);
        let summary = ctx.store.save(&record).await?;
        ctx.metrics.record_persisted(summary.total());

        Ok(record)
    }

    async fn fetch_one(&self, adapter: &dyn SourceAdapter, ctx: &JobContext) -> RawFetchResult {
        let kind = adapter.kind();
        let result = match tokio::time::timeout(ctx.fetch_timeout, adapter.fetch(&self.entity)).await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    entity = %self.entity.key,
                    source = %kind,
                    timeout = ?ctx.fetch_timeout,
                    "Source call timed out"
                );
                RawFetchResult::failed(kind, SourceFailure::Timeout(ctx.fetch_timeout))
            }
        };

        ctx.metrics.record_source_call(result.is_success());
        debug!(
            entity = %self.entity.key,
            source = %kind,
            items = result.payload.len(),
            success = result.is_success(),
            "Source call finished"
        );
        result
    }
}
