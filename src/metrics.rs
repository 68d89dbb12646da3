//! Run-wide counters.
//!
//! Handles are cheap to clone; every clone updates the same atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

#[derive(Debug)]
struct Counters {
    started: Instant,
    source_calls: AtomicU64,
    source_calls_succeeded: AtomicU64,
    source_calls_failed: AtomicU64,
    rate_limit_waits: AtomicU64,
    validation_failures: AtomicU64,
    records_persisted: AtomicU64,
    entities_completed: AtomicU64,
    entities_failed: AtomicU64,
}

/// Shared metrics collector.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<Counters>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Counters {
                started: Instant::now(),
                source_calls: AtomicU64::new(0),
                source_calls_succeeded: AtomicU64::new(0),
                source_calls_failed: AtomicU64::new(0),
                rate_limit_waits: AtomicU64::new(0),
                validation_failures: AtomicU64::new(0),
                records_persisted: AtomicU64::new(0),
                entities_completed: AtomicU64::new(0),
                entities_failed: AtomicU64::new(0),
            }),
        }
    }

    /// Record one adapter invocation.
    pub fn record_source_call(&self, success: bool) {
        self.inner.source_calls.fetch_add(1, Ordering::Relaxed);
        let counter = if success {
            &self.inner.source_calls_succeeded
        } else {
            &self.inner.source_calls_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limit_wait(&self) {
        self.inner.rate_limit_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_failures(&self, count: usize) {
        self.inner
            .validation_failures
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_persisted(&self, count: usize) {
        self.inner
            .records_persisted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_entity(&self, success: bool) {
        let counter = if success {
            &self.inner.entities_completed
        } else {
            &self.inner.entities_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter plus derived rates.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.inner;
        let runtime_seconds = c.started.elapsed().as_secs_f64();
        let total = c.source_calls.load(Ordering::Relaxed);
        let succeeded = c.source_calls_succeeded.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_source_calls: total,
            successful_source_calls: succeeded,
            failed_source_calls: c.source_calls_failed.load(Ordering::Relaxed),
            rate_limit_waits: c.rate_limit_waits.load(Ordering::Relaxed),
            validation_failures: c.validation_failures.load(Ordering::Relaxed),
            records_persisted: c.records_persisted.load(Ordering::Relaxed),
            entities_completed: c.entities_completed.load(Ordering::Relaxed),
            entities_failed: c.entities_failed.load(Ordering::Relaxed),
            runtime_seconds,
            calls_per_second: if runtime_seconds > 0.0 {
                total as f64 / runtime_seconds
            } else {
                0.0
            },
            success_rate: if total > 0 {
                succeeded as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Log the current snapshot as a single JSON field.
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        match serde_json::to_string(&snapshot) {
            Ok(json) => info!(metrics = %json, "Run metrics"),
            Err(e) => info!(error = %e, ?snapshot, "Run metrics"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_source_calls: u64,
    pub successful_source_calls: u64,
    pub failed_source_calls: u64,
    pub rate_limit_waits: u64,
    pub validation_failures: u64,
    pub records_persisted: u64,
    pub entities_completed: u64,
    pub entities_failed: u64,
    pub runtime_seconds: f64,
    pub calls_per_second: f64,
    pub success_rate: f64,
}
