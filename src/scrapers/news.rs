//! News adapter backed by the NewsAPI `everything` endpoint.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use super::{HttpClient, SourceAdapter, SourceFailure};
use crate::models::{Entity, RawArticle, RawFetchResult, RawPayload, SourceKind};

const DEFAULT_ENDPOINT: &str = "https://newsapi.org/v2/everything";

/// Environment variable holding the news API key.
pub const API_KEY_VAR: &str = "GOOGLE_NEWS_API_KEY";

/// Default lookback window in days.
pub const DEFAULT_DAYS_BACK: u32 = 30;

const PAGE_SIZE: u32 = 100;

const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "positive",
    "growth",
    "profit",
    "success",
];
const NEGATIVE_WORDS: &[&str] = &[
    "bad", "poor", "negative", "loss", "decline", "failure", "crisis",
];

/// Scores text sentiment in [-1, 1].
pub trait SentimentScorer: Send + Sync {
    /// `None` when there is nothing to score.
    fn score(&self, text: &str) -> Option<f64>;
}

/// Keyword-count sentiment: distinct positive keywords present minus distinct
/// negative keywords present, divided by word count.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordSentiment;

impl SentimentScorer for KeywordSentiment {
    fn score(&self, text: &str) -> Option<f64> {
        let lowered = text.to_lowercase();
        let words = lowered.split_whitespace().count();
        if words == 0 {
            return None;
        }

        let count = |keywords: &[&str]| {
            keywords
                .iter()
                .filter(|keyword| lowered.contains(*keyword))
                .collect::<HashSet<_>>()
                .len() as f64
        };
        let positive = count(POSITIVE_WORDS);
        let negative = count(NEGATIVE_WORDS);

        Some(((positive - negative) / words as f64).clamp(-1.0, 1.0))
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NewsApiResponse {
    #[serde(default)]
    pub articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
pub struct NewsApiArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "publishedAt", default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub source: NewsApiSource,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsApiSource {
    #[serde(default)]
    pub name: Option<String>,
}

/// Turn a provider response into raw articles, scoring each description.
pub fn parse_news_response(
    response: NewsApiResponse,
    scorer: &dyn SentimentScorer,
) -> Vec<RawArticle> {
    response
        .articles
        .into_iter()
        .map(|article| {
            let sentiment = article
                .description
                .as_deref()
                .and_then(|text| scorer.score(text));
            RawArticle {
                title: article.title.unwrap_or_default(),
                url: article.url.unwrap_or_default(),
                published_at: article.published_at.unwrap_or_default(),
                source_name: article.source.name.unwrap_or_default(),
                content: article.content,
                description: article.description,
                sentiment,
            }
        })
        .collect()
}

/// Fetches recent articles mentioning an entity by name.
pub struct NewsAdapter {
    client: HttpClient,
    api_key: Option<String>,
    days_back: u32,
    endpoint: String,
    scorer: Arc<dyn SentimentScorer>,
}

impl NewsAdapter {
    pub fn new(client: HttpClient, api_key: Option<String>, days_back: u32) -> Self {
        Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            days_back,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            scorer: Arc::new(KeywordSentiment),
        }
    }

    /// Replace the sentiment scorer.
    pub fn with_scorer(mut self, scorer: Arc<dyn SentimentScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn query(&self, entity: &Entity, api_key: &str) -> Vec<(&'static str, String)> {
        let to = Utc::now().date_naive();
        let from = to - ChronoDuration::days(i64::from(self.days_back));

        vec![
            ("q", format!("\"{}\"", entity.display_name)),
            ("from", from.format("%Y-%m-%d").to_string()),
            ("to", to.format("%Y-%m-%d").to_string()),
            ("sortBy", "publishedAt".to_string()),
            ("language", "en".to_string()),
            ("pageSize", PAGE_SIZE.to_string()),
            ("apiKey", api_key.to_string()),
        ]
    }
}

#[async_trait]
impl SourceAdapter for NewsAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::News
    }

    async fn fetch(&self, entity: &Entity) -> RawFetchResult {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!(entity = %entity.key, "News API key not configured");
            return RawFetchResult::failed(
                SourceKind::News,
                SourceFailure::MissingCredential(API_KEY_VAR),
            );
        };

        let query = self.query(entity, api_key);
        let response = match self
            .client
            .get_json::<NewsApiResponse>(&self.endpoint, &query)
            .await
        {
            Ok(response) => response,
            Err(failure) => {
                warn!(entity = %entity.key, error = %failure, "News request failed");
                return RawFetchResult::failed(SourceKind::News, failure);
            }
        };

        let articles = parse_news_response(response, self.scorer.as_ref());
        info!(entity = %entity.key, articles = articles.len(), "Fetched news");
        RawFetchResult::success(RawPayload::News(articles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::rate_limiter::{Rate, RateLimiter};

    #[test]
    fn test_positive_text_scores_above_zero() {
        let score = KeywordSentiment
            .score("Record growth and great profit this quarter")
            .unwrap();
        assert!(score > 0.0);
    }

    #[test]
    fn test_negative_text_scores_below_zero() {
        let score = KeywordSentiment
            .score("Shares decline amid crisis and heavy loss")
            .unwrap();
        assert!(score < 0.0);
    }

    #[test]
    fn test_empty_text_has_no_score() {
        assert_eq!(KeywordSentiment.score(""), None);
        assert_eq!(KeywordSentiment.score("   "), None);
    }

    #[test]
    fn test_repeated_keyword_counts_once() {
        // One distinct keyword over four words.
        let score = KeywordSentiment.score("good good good good").unwrap();
        assert!((score - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_is_clamped() {
        let score = KeywordSentiment.score("greatsuccess").unwrap();
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_parse_news_response() {
        let json = r#"{
            "status": "ok",
            "totalResults": 2,
            "articles": [
                {
                    "source": {"id": null, "name": "Reuters"},
                    "title": "Apple posts growth",
                    "url": "https://example.com/a",
                    "publishedAt": "2024-01-02T10:00:00Z",
                    "description": "great quarter",
                    "content": "Full text"
                },
                {
                    "source": {"name": "Wire"},
                    "title": "Untitled",
                    "url": "https://example.com/b",
                    "publishedAt": "2024-01-03T10:00:00Z",
                    "description": null
                }
            ]
        }"#;
        let response: NewsApiResponse = serde_json::from_str(json).unwrap();
        let articles = parse_news_response(response, &KeywordSentiment);

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source_name, "Reuters");
        assert_eq!(articles[0].published_at, "2024-01-02T10:00:00Z");
        assert!(articles[0].sentiment.unwrap() > 0.0);
        assert_eq!(articles[1].sentiment, None);
        assert_eq!(articles[1].content, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_key_fails_without_network() {
        let limiter = RateLimiter::new("news_api", Rate::PerDay(100.0)).unwrap();
        let client = HttpClient::builder(SourceKind::News, limiter.clone())
            .build()
            .unwrap();
        let adapter = NewsAdapter::new(client, Some("  ".to_string()), DEFAULT_DAYS_BACK);

        let result = adapter.fetch(&Entity::new("0000320193", "Apple Inc.")).await;

        assert_eq!(
            result.failure,
            Some(SourceFailure::MissingCredential(API_KEY_VAR))
        );
        assert!(result.payload.is_empty());
        assert_eq!(limiter.stats().await.total_calls, 0);
    }
}
