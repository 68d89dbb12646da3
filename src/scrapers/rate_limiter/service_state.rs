//! Per-service rate limiting state.

use std::time::Duration;

use tokio::time::Instant;

/// State for a single external service.
#[derive(Debug, Clone)]
pub struct ServiceState {
    /// Minimum spacing between permitted calls.
    pub min_interval: Duration,
    /// When the last call was permitted.
    pub last_permitted: Option<Instant>,
    /// Total calls permitted.
    pub total_calls: u64,
    /// Calls that had to wait before being permitted.
    pub waits: u64,
    /// Accumulated waiting time.
    pub total_waited: Duration,
}

impl ServiceState {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_permitted: None,
            total_calls: 0,
            waits: 0,
            total_waited: Duration::ZERO,
        }
    }

    /// Time until the service may be called again, measured at `now`.
    pub fn time_until_ready(&self, now: Instant) -> Duration {
        match self.last_permitted {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                self.min_interval.saturating_sub(elapsed)
            }
            None => Duration::ZERO,
        }
    }

    /// Record a permitted call at `now` after waiting `waited`.
    pub fn record_permit(&mut self, now: Instant, waited: Duration) {
        self.last_permitted = Some(now);
        self.total_calls += 1;
        if waited > Duration::ZERO {
            self.waits += 1;
            self.total_waited += waited;
        }
    }
}
