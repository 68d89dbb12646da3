//! Domain models for entities, raw source payloads and validated records.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::scrapers::SourceFailure;

/// A company being tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Ten-digit, zero-padded registry key (SEC CIK).
    #[serde(alias = "cik")]
    pub key: String,
    /// Display name, also used to attribute news and reviews.
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
}

impl Entity {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            ticker: None,
            industry: None,
            sector: None,
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_classification(
        mut self,
        industry: impl Into<String>,
        sector: impl Into<String>,
    ) -> Self {
        self.industry = Some(industry.into());
        self.sector = Some(sector.into());
        self
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.key)
    }
}

// ============================================================================
// Raw payloads
// ============================================================================

/// External service a raw result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Filings,
    News,
    Reviews,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filings => "filings",
            Self::News => "news",
            Self::Reviews => "reviews",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monetary figures pulled from one filing. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialFigures {
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub total_debt: Option<f64>,
    pub cash_flow: Option<f64>,
    pub assets: Option<f64>,
    pub liabilities: Option<f64>,
    pub equity: Option<f64>,
}

impl FinancialFigures {
    pub fn is_empty(&self) -> bool {
        self.revenue.is_none()
            && self.net_income.is_none()
            && self.total_debt.is_none()
            && self.cash_flow.is_none()
            && self.assets.is_none()
            && self.liabilities.is_none()
            && self.equity.is_none()
    }
}

/// Unvalidated figures for one filing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFiling {
    pub filing_date: Option<NaiveDate>,
    pub period_end_date: Option<NaiveDate>,
    pub figures: FinancialFigures,
    pub source_url: String,
}

/// Unvalidated news article as returned by the news provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArticle {
    pub title: String,
    pub url: String,
    pub published_at: String,
    pub source_name: String,
    pub content: Option<String>,
    pub description: Option<String>,
    pub sentiment: Option<f64>,
}

/// Unvalidated employee review scraped from a listing page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReview {
    pub rating: f64,
    pub review_text: Option<String>,
    pub job_title: Option<String>,
    pub location: Option<String>,
    pub review_date: Option<NaiveDate>,
    pub pros: Option<String>,
    pub cons: Option<String>,
    pub sub_ratings: SubRatings,
}

/// The five optional category ratings attached to a review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubRatings {
    pub work_life_balance: Option<f64>,
    pub culture_values: Option<f64>,
    pub career_opportunities: Option<f64>,
    pub compensation_benefits: Option<f64>,
    pub senior_management: Option<f64>,
}

impl SubRatings {
    /// Named values, in schema column order.
    pub fn named(&self) -> [(&'static str, Option<f64>); 5] {
        [
            ("work_life_balance", self.work_life_balance),
            ("culture_values", self.culture_values),
            ("career_opportunities", self.career_opportunities),
            ("compensation_benefits", self.compensation_benefits),
            ("senior_management", self.senior_management),
        ]
    }
}

/// Service-specific payload of a fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Filings(Vec<RawFiling>),
    News(Vec<RawArticle>),
    Reviews(Vec<RawReview>),
}

impl RawPayload {
    pub fn empty(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Filings => Self::Filings(Vec::new()),
            SourceKind::News => Self::News(Vec::new()),
            SourceKind::Reviews => Self::Reviews(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Filings(items) => items.len(),
            Self::News(items) => items.len(),
            Self::Reviews(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of one adapter call. A failed call carries an empty payload.
#[derive(Debug, Clone)]
pub struct RawFetchResult {
    pub source: SourceKind,
    pub payload: RawPayload,
    pub failure: Option<SourceFailure>,
}

impl RawFetchResult {
    pub fn success(payload: RawPayload) -> Self {
        let source = match &payload {
            RawPayload::Filings(_) => SourceKind::Filings,
            RawPayload::News(_) => SourceKind::News,
            RawPayload::Reviews(_) => SourceKind::Reviews,
        };
        Self {
            source,
            payload,
            failure: None,
        }
    }

    pub fn failed(source: SourceKind, failure: SourceFailure) -> Self {
        Self {
            source,
            payload: RawPayload::empty(source),
            failure: Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

// ============================================================================
// Validated records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialMetricRecord {
    pub entity_key: String,
    pub figures: FinancialFigures,
    pub filing_date: NaiveDate,
    pub period_end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsArticleRecord {
    pub display_name: String,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub content: Option<String>,
    pub sentiment_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeReviewRecord {
    pub display_name: String,
    pub rating: f64,
    pub review_text: Option<String>,
    pub job_title: Option<String>,
    pub location: Option<String>,
    pub review_date: Option<NaiveDate>,
    pub pros: Option<String>,
    pub cons: Option<String>,
    pub sub_ratings: SubRatings,
}

/// Everything collected for one entity in one job run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    pub entity: Entity,
    pub financial_metrics: Vec<FinancialMetricRecord>,
    pub news_articles: Vec<NewsArticleRecord>,
    pub employee_reviews: Vec<EmployeeReviewRecord>,
    pub last_updated: DateTime<Utc>,
}

impl EntityRecord {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            financial_metrics: Vec::new(),
            news_articles: Vec::new(),
            employee_reviews: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    /// Total number of child records.
    pub fn record_count(&self) -> usize {
        self.financial_metrics.len() + self.news_articles.len() + self.employee_reviews.len()
    }
}
