//! Per-service interval rate limiter.
//!
//! Every external service gets exactly one limiter. Clones share state, so the
//! aggregate request rate to a service stays within budget no matter how many
//! entity jobs are running.

mod service_state;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub use service_state::ServiceState;

/// Seconds in a day, for converting daily quotas.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Errors building a rate limiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateLimitError {
    #[error("Invalid rate for {service}: {rate} (must be positive and finite)")]
    InvalidRate { service: String, rate: f64 },
}

/// A request budget for one service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rate {
    PerSecond(f64),
    PerDay(f64),
}

impl Rate {
    /// Budget expressed in calls per second.
    pub fn calls_per_second(&self) -> f64 {
        match *self {
            Rate::PerSecond(rate) => rate,
            Rate::PerDay(rate) => rate / SECONDS_PER_DAY,
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rate::PerSecond(rate) => write!(f, "{rate}/s"),
            Rate::PerDay(rate) => write!(f, "{rate}/day"),
        }
    }
}

/// Interval gate shared by every caller of one service.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    service: Arc<str>,
    state: Arc<Mutex<ServiceState>>,
}

impl RateLimiter {
    /// Create a limiter for `service` allowing `rate`.
    pub fn new(service: &str, rate: Rate) -> Result<Self, RateLimitError> {
        let per_second = rate.calls_per_second();
        let invalid = || RateLimitError::InvalidRate {
            service: service.to_string(),
            rate: per_second,
        };
        if !per_second.is_finite() || per_second <= 0.0 {
            return Err(invalid());
        }

        // Tiny rates give an interval too long for a Duration.
        let interval = Duration::try_from_secs_f64(1.0 / per_second).map_err(|_| invalid())?;
        Ok(Self::with_interval(service, interval))
    }

    /// Create a limiter with an explicit minimum interval between calls.
    pub fn with_interval(service: &str, min_interval: Duration) -> Self {
        Self {
            service: Arc::from(service),
            state: Arc::new(Mutex::new(ServiceState::new(min_interval))),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Wait until the service may be called, then record the call.
    ///
    /// The lock is held while sleeping so queued callers are released one
    /// interval apart. Returns how long this caller waited.
    pub async fn acquire(&self) -> Duration {
        let requested = Instant::now();
        let mut state = self.state.lock().await;

        let wait = state.time_until_ready(Instant::now());
        if wait > Duration::ZERO {
            debug!(service = %self.service, ?wait, "Rate limiting");
            tokio::time::sleep(wait).await;
        }

        let now = Instant::now();
        let waited = now.saturating_duration_since(requested);
        state.record_permit(now, if wait > Duration::ZERO { waited } else { Duration::ZERO });
        waited
    }

    /// Snapshot of this limiter's counters.
    pub async fn stats(&self) -> LimiterStats {
        let state = self.state.lock().await;
        LimiterStats {
            service: self.service.to_string(),
            min_interval: state.min_interval,
            total_calls: state.total_calls,
            waits: state.waits,
            total_waited: state.total_waited,
        }
    }
}

/// Statistics for a service.
#[derive(Debug, Clone)]
pub struct LimiterStats {
    pub service: String,
    pub min_interval: Duration,
    pub total_calls: u64,
    pub waits: u64,
    pub total_waited: Duration,
}
