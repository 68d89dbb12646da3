//! Source adapters and the plumbing they share.
//!
//! Each adapter knows how to fetch raw records for one entity from one external
//! service. Adapters never fail the caller: transport errors, bad statuses and
//! missing credentials come back as an empty [`RawFetchResult`] carrying a
//! [`SourceFailure`].

pub mod extract;
pub mod filings;
pub mod http_client;
pub mod news;
pub mod rate_limiter;
pub mod reviews;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use filings::FilingsAdapter;
pub use http_client::HttpClient;
pub use news::{KeywordSentiment, NewsAdapter, SentimentScorer};
pub use rate_limiter::{Rate, RateLimitError, RateLimiter};
pub use reviews::ReviewsAdapter;

use crate::config::Settings;
use crate::metrics::Metrics;
use crate::models::{Entity, RawFetchResult, SourceKind};

/// Why an adapter call produced no data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceFailure {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unreadable response: {0}")]
    Parse(String),
}

/// Capability: fetch raw records for an entity from one service.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Service this adapter talks to.
    fn kind(&self) -> SourceKind;

    /// Fetch raw records. Failures are reported inside the result.
    async fn fetch(&self, entity: &Entity) -> RawFetchResult;
}

/// One rate limiter per external service, built once per run.
#[derive(Debug, Clone)]
pub struct ServiceLimiters {
    pub filings: RateLimiter,
    pub news: RateLimiter,
    pub reviews: RateLimiter,
}

impl ServiceLimiters {
    pub fn from_settings(settings: &Settings) -> Result<Self, RateLimitError> {
        Ok(Self {
            filings: RateLimiter::new("sec_edgar", settings.rates.filings)?,
            news: RateLimiter::new("news_api", settings.rates.news)?,
            reviews: RateLimiter::new("glassdoor", settings.rates.reviews)?,
        })
    }
}

/// Build the standard adapters in fetch order: filings, news, reviews.
///
/// Filings come first because they are the slowest and the most likely to
/// run into their rate limit.
pub fn build_adapters(
    settings: &Settings,
    limiters: &ServiceLimiters,
    metrics: &Metrics,
) -> Result<Vec<Arc<dyn SourceAdapter>>, reqwest::Error> {
    let timeout = settings.request_timeout();

    let filings_client = HttpClient::builder(SourceKind::Filings, limiters.filings.clone())
        .user_agent(Some(&settings.sec_user_agent))
        .timeout(timeout)
        .metrics(metrics.clone())
        .build()?;
    let news_client = HttpClient::builder(SourceKind::News, limiters.news.clone())
        .timeout(timeout)
        .metrics(metrics.clone())
        .build()?;
    let reviews_client = HttpClient::builder(SourceKind::Reviews, limiters.reviews.clone())
        .user_agent(Some("impersonate"))
        .timeout(timeout)
        .metrics(metrics.clone())
        .build()?;

    Ok(vec![
        Arc::new(FilingsAdapter::new(
            filings_client,
            settings.max_filings_per_entity,
        )),
        Arc::new(NewsAdapter::new(
            news_client,
            settings.news_api_key.clone(),
            settings.news_days_back,
        )),
        Arc::new(ReviewsAdapter::new(reviews_client)),
    ])
}
