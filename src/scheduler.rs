//! Bounded-concurrency batch runner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::job::{EntityJob, JobContext, JobError};
use crate::models::{Entity, EntityRecord};

/// Default number of entity jobs in flight.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Shared flag that stops new jobs from starting. Running jobs finish.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An entity whose job failed.
#[derive(Debug)]
pub struct EntityFailure {
    pub entity: Entity,
    pub error: JobError,
}

/// Outcome of one batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<EntityRecord>,
    pub failed: Vec<EntityFailure>,
    /// Entities never started because the stop signal fired first.
    pub skipped: Vec<Entity>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len() + self.skipped.len()
    }
}

enum Outcome {
    Completed(EntityRecord),
    Failed(EntityFailure),
    Skipped(Entity),
}

/// Runs entity jobs with at most `concurrency` in flight.
pub struct Scheduler {
    ctx: JobContext,
    concurrency: usize,
    stop: StopSignal,
}

impl Scheduler {
    pub fn new(ctx: JobContext, concurrency: usize) -> Self {
        Self {
            ctx,
            concurrency: concurrency.max(1),
            stop: StopSignal::new(),
        }
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Run every entity and report each outcome. Always runs to the end of
    /// the list; entities reached after a stop are reported as skipped.
    pub async fn run(&self, entities: Vec<Entity>) -> BatchReport {
        info!(
            entities = entities.len(),
            concurrency = self.concurrency,
            "Starting batch"
        );

        let outcomes: Vec<Outcome> = stream::iter(entities)
            .map(|entity| {
                let ctx = self.ctx.clone();
                let stop = self.stop.clone();
                async move {
                    if stop.is_stopped() {
                        return Outcome::Skipped(entity);
                    }
                    run_isolated(entity, ctx).await
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Completed(record) => report.completed.push(record),
                Outcome::Failed(failure) => report.failed.push(failure),
                Outcome::Skipped(entity) => report.skipped.push(entity),
            }
        }

        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Batch finished"
        );
        report
    }
}

/// Run one job on its own task so a panic surfaces as a failure.
async fn run_isolated(entity: Entity, ctx: JobContext) -> Outcome {
    let task_entity = entity.clone();
    let metrics = ctx.metrics.clone();
    let handle = tokio::spawn(async move {
        let mut job = EntityJob::new(task_entity);
        job.run(&ctx).await
    });

    match handle.await {
        Ok(Ok(record)) => Outcome::Completed(record),
        Ok(Err(error)) => Outcome::Failed(EntityFailure { entity, error }),
        Err(join_error) => {
            warn!(entity = %entity.key, error = %join_error, "Entity job aborted");
            metrics.record_entity(false);
            Outcome::Failed(EntityFailure {
                entity,
                error: JobError::Aborted(join_error.to_string()),
            })
        }
    }
}
