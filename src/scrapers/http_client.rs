//! Rate-limited HTTP client shared by the source adapters.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::rate_limiter::RateLimiter;
use super::SourceFailure;
use crate::metrics::Metrics;
use crate::models::SourceKind;

const USER_AGENT: &str = "corpscrape/0.1 (company research)";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Real browser user agents for impersonate mode.
const IMPERSONATE_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Safari on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
];

/// Get a random user agent for impersonate mode.
fn random_user_agent() -> &'static str {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as usize)
        .unwrap_or(0);
    IMPERSONATE_USER_AGENTS[nanos % IMPERSONATE_USER_AGENTS.len()]
}

/// Resolve user agent from config value.
/// - None => default corpscrape user agent
/// - "impersonate" => random real browser user agent
/// - other => custom user agent string
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config {
        None => USER_AGENT.to_string(),
        Some("impersonate") => random_user_agent().to_string(),
        Some(custom) => custom.to_string(),
    }
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    source: SourceKind,
    rate_limiter: RateLimiter,
    user_agent: String,
    timeout: Duration,
    metrics: Option<Metrics>,
}

impl HttpClientBuilder {
    /// User agent configuration, see [`resolve_user_agent`].
    pub fn user_agent(mut self, config: Option<&str>) -> Self {
        self.user_agent = resolve_user_agent(config);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Record rate-limit waits into `metrics`.
    pub fn metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<HttpClient, reqwest::Error> {
        let client = Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(HttpClient {
            client,
            source: self.source,
            rate_limiter: self.rate_limiter,
            timeout: self.timeout,
            metrics: self.metrics,
        })
    }
}

/// HTTP client that waits on its service's rate limiter before every request.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    source: SourceKind,
    rate_limiter: RateLimiter,
    timeout: Duration,
    metrics: Option<Metrics>,
}

impl HttpClient {
    /// Start building a client for `source` gated by `rate_limiter`.
    pub fn builder(source: SourceKind, rate_limiter: RateLimiter) -> HttpClientBuilder {
        HttpClientBuilder {
            source,
            rate_limiter,
            user_agent: USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            metrics: None,
        }
    }

    /// Get the rate limiter for this client.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// GET `url` with `query` parameters; non-2xx responses are failures.
    pub async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, SourceFailure> {
        let waited = self.rate_limiter.acquire().await;
        if waited > Duration::ZERO {
            if let Some(metrics) = &self.metrics {
                metrics.record_rate_limit_wait();
            }
        }

        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_failure(url, e))?;
        let status = response.status();

        debug!(
            source = %self.source,
            url,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Request finished"
        );

        if !status.is_success() {
            warn!(source = %self.source, url, status = status.as_u16(), "Request failed");
            return Err(SourceFailure::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response)
    }

    /// Get response body as text.
    pub async fn get_text(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<String, SourceFailure> {
        let response = self.get(url, query).await?;
        response
            .text()
            .await
            .map_err(|e| self.transport_failure(url, e))
    }

    /// Get response body decoded from JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceFailure> {
        let response = self.get(url, query).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| SourceFailure::Parse(e.to_string()))
    }

    fn transport_failure(&self, url: &str, error: reqwest::Error) -> SourceFailure {
        warn!(source = %self.source, url, error = %error, "Transport error");
        if error.is_timeout() {
            SourceFailure::Timeout(self.timeout)
        } else {
            SourceFailure::Transport(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::rate_limiter::Rate;

    #[test]
    fn test_resolve_user_agent_default() {
        let ua = resolve_user_agent(None);
        assert!(ua.contains("corpscrape"));
    }

    #[test]
    fn test_resolve_user_agent_impersonate() {
        let ua = resolve_user_agent(Some("impersonate"));
        assert!(ua.contains("Mozilla"));
        assert!(!ua.contains("corpscrape"));
    }

    #[test]
    fn test_resolve_user_agent_custom() {
        let ua = resolve_user_agent(Some("Research Co admin@example.com"));
        assert_eq!(ua, "Research Co admin@example.com");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_failure() {
        let limiter = RateLimiter::new("test", Rate::PerSecond(100.0)).unwrap();
        let metrics = Metrics::new();
        let client = HttpClient::builder(SourceKind::News, limiter)
            .timeout(Duration::from_secs(2))
            .metrics(metrics.clone())
            .build()
            .unwrap();

        // Port 9 (discard) on localhost is closed in test environments.
        let result = client.get_text("http://127.0.0.1:9/", &[]).await;
        assert!(matches!(
            result,
            Err(SourceFailure::Transport(_)) | Err(SourceFailure::Timeout(_))
        ));
        assert_eq!(client.rate_limiter().stats().await.total_calls, 1);
    }
}
