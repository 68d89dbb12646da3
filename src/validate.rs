//! Record validation.
//!
//! Pure functions turning raw fetched data into typed records. Nothing here
//! performs I/O or rewrites its input; keys in particular are never padded.

use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::models::{
    EmployeeReviewRecord, Entity, FinancialMetricRecord, NewsArticleRecord, RawArticle,
    RawFetchResult, RawFiling, RawPayload, RawReview,
};

const ENTITY_KEY_LEN: usize = 10;
const MAX_DISPLAY_NAME: usize = 200;
const MAX_TICKER: usize = 10;
const MAX_CLASSIFICATION: usize = 100;
const MAX_TITLE: usize = 500;
const MAX_SOURCE_NAME: usize = 100;
const MAX_JOB_TITLE: usize = 200;
const MAX_LOCATION: usize = 100;
const RATING_RANGE: std::ops::RangeInclusive<f64> = 1.0..=5.0;
const SENTIMENT_RANGE: std::ops::RangeInclusive<f64> = -1.0..=1.0;

/// Why a record was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Entity key must be exactly 10 digits, got {0:?}")]
    InvalidKey(String),

    #[error("{field} must be between {min} and {max} characters, got {len}")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
        len: usize,
    },

    #[error("Missing required field: {0}")]
    Missing(&'static str),

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid timestamp {0:?}")]
    InvalidTimestamp(String),
}

/// Output of validating one fetch result.
#[derive(Debug, Default)]
pub struct Validated {
    pub financial_metrics: Vec<FinancialMetricRecord>,
    pub news_articles: Vec<NewsArticleRecord>,
    pub employee_reviews: Vec<EmployeeReviewRecord>,
    /// One entry per dropped item.
    pub failures: Vec<ValidationError>,
}

impl Validated {
    pub fn record_count(&self) -> usize {
        self.financial_metrics.len() + self.news_articles.len() + self.employee_reviews.len()
    }
}

/// Validate every item in `raw` for `entity`.
pub fn validate(entity: &Entity, raw: &RawFetchResult) -> Validated {
    let mut validated = Validated::default();

    match &raw.payload {
        RawPayload::Filings(filings) => {
            for filing in filings {
                match validate_financial(&entity.key, filing) {
                    Ok(record) => validated.financial_metrics.push(record),
                    Err(e) => validated.failures.push(e),
                }
            }
        }
        RawPayload::News(articles) => {
            for article in articles {
                match validate_article(&entity.display_name, article) {
                    Ok(record) => validated.news_articles.push(record),
                    Err(e) => validated.failures.push(e),
                }
            }
        }
        RawPayload::Reviews(reviews) => {
            for review in reviews {
                match validate_review(&entity.display_name, review) {
                    Ok(record) => validated.employee_reviews.push(record),
                    Err(e) => validated.failures.push(e),
                }
            }
        }
    }

    validated
}

/// Check the entity's key and display name.
pub fn validate_entity(entity: &Entity) -> Result<(), ValidationError> {
    validate_entity_key(&entity.key)?;
    check_length("display_name", &entity.display_name, 1, MAX_DISPLAY_NAME)?;
    for (field, value, max) in [
        ("ticker", &entity.ticker, MAX_TICKER),
        ("industry", &entity.industry, MAX_CLASSIFICATION),
        ("sector", &entity.sector, MAX_CLASSIFICATION),
    ] {
        if let Some(value) = value {
            check_length(field, value, 0, max)?;
        }
    }
    Ok(())
}

/// Keys are exactly ten ASCII digits.
pub fn validate_entity_key(key: &str) -> Result<(), ValidationError> {
    if key.len() == ENTITY_KEY_LEN && key.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidKey(key.to_string()))
    }
}

pub fn validate_financial(
    entity_key: &str,
    filing: &RawFiling,
) -> Result<FinancialMetricRecord, ValidationError> {
    validate_entity_key(entity_key)?;
    let filing_date = filing
        .filing_date
        .ok_or(ValidationError::Missing("filing_date"))?;
    let period_end_date = filing
        .period_end_date
        .ok_or(ValidationError::Missing("period_end_date"))?;

    let figures = &filing.figures;
    for (field, value) in [
        ("revenue", figures.revenue),
        ("total_debt", figures.total_debt),
        ("assets", figures.assets),
        ("liabilities", figures.liabilities),
    ] {
        if let Some(value) = value {
            if value < 0.0 {
                return Err(ValidationError::Negative { field, value });
            }
        }
    }
    for (field, value) in [
        ("net_income", figures.net_income),
        ("cash_flow", figures.cash_flow),
        ("equity", figures.equity),
    ] {
        if let Some(value) = value {
            if !value.is_finite() {
                return Err(ValidationError::OutOfRange { field, value });
            }
        }
    }

    Ok(FinancialMetricRecord {
        entity_key: entity_key.to_string(),
        figures: figures.clone(),
        filing_date,
        period_end_date,
    })
}

pub fn validate_article(
    display_name: &str,
    article: &RawArticle,
) -> Result<NewsArticleRecord, ValidationError> {
    check_length("display_name", display_name, 1, MAX_DISPLAY_NAME)?;
    check_length("title", &article.title, 1, MAX_TITLE)?;
    check_length("source", &article.source_name, 1, MAX_SOURCE_NAME)?;
    check_url(&article.url)?;

    let published_at = DateTime::parse_from_rfc3339(&article.published_at)
        .map_err(|_| ValidationError::InvalidTimestamp(article.published_at.clone()))?
        .with_timezone(&Utc);

    if let Some(score) = article.sentiment {
        check_range("sentiment_score", score, SENTIMENT_RANGE)?;
    }

    Ok(NewsArticleRecord {
        display_name: display_name.to_string(),
        title: article.title.clone(),
        url: article.url.clone(),
        published_at,
        source: article.source_name.clone(),
        content: article.content.clone(),
        sentiment_score: article.sentiment,
    })
}

pub fn validate_review(
    display_name: &str,
    review: &RawReview,
) -> Result<EmployeeReviewRecord, ValidationError> {
    check_length("display_name", display_name, 1, MAX_DISPLAY_NAME)?;
    check_range("rating", review.rating, RATING_RANGE)?;
    for (field, value) in review.sub_ratings.named() {
        if let Some(value) = value {
            check_range(field, value, RATING_RANGE)?;
        }
    }
    if let Some(job_title) = &review.job_title {
        check_length("job_title", job_title, 0, MAX_JOB_TITLE)?;
    }
    if let Some(location) = &review.location {
        check_length("location", location, 0, MAX_LOCATION)?;
    }

    Ok(EmployeeReviewRecord {
        display_name: display_name.to_string(),
        rating: review.rating,
        review_text: review.review_text.clone(),
        job_title: review.job_title.clone(),
        location: review.location.clone(),
        review_date: review.review_date,
        pros: review.pros.clone(),
        cons: review.cons.clone(),
        sub_ratings: review.sub_ratings,
    })
}

fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::Length {
            field,
            min,
            max,
            len,
        });
    }
    Ok(())
}

fn check_range(
    field: &'static str,
    value: f64,
    range: std::ops::RangeInclusive<f64>,
) -> Result<(), ValidationError> {
    // NaN fails `contains`.
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field, value })
    }
}

fn check_url(raw: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(())
}
