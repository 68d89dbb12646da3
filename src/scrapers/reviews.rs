//! Employee reviews adapter (Glassdoor listing pages).
//!
//! The markup changes often and the site actively blocks scrapers, so this is
//! best effort: an unreadable page yields no reviews rather than an error.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

use super::{HttpClient, SourceAdapter};
use crate::models::{Entity, RawFetchResult, RawPayload, RawReview, SourceKind};

const DEFAULT_BASE_URL: &str = "https://www.glassdoor.com";

/// Rating used when a block has no readable rating.
pub const DEFAULT_RATING: f64 = 3.0;

static REVIEW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[class*="review"], div[class*="Review"]"#).expect("valid review selector")
});
static RATING_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"span[class*="rating"], span[class*="Rating"]"#).expect("valid rating selector")
});
static TEXT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[class*="text"], div[class*="content"], div[class*="reviewText"]"#)
        .expect("valid text selector")
});
static JOB_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"span[class*="job"], span[class*="title"], span[class*="position"]"#)
        .expect("valid job selector")
});
static LOCATION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"span[class*="location"], span[class*="Location"]"#)
        .expect("valid location selector")
});
static RATING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)").expect("valid rating regex"));

pub struct ReviewsAdapter {
    client: HttpClient,
    base_url: String,
}

impl ReviewsAdapter {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Reviews page for a company name.
    pub fn reviews_url(&self, display_name: &str) -> String {
        let slug = urlencoding::encode(&display_name.replace(' ', "-")).into_owned();
        format!("{}/Reviews/{}-Reviews", self.base_url, slug)
    }
}

#[async_trait]
impl SourceAdapter for ReviewsAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Reviews
    }

    async fn fetch(&self, entity: &Entity) -> RawFetchResult {
        let url = self.reviews_url(&entity.display_name);
        let body = match self.client.get_text(&url, &[]).await {
            Ok(body) => body,
            Err(failure) => {
                warn!(entity = %entity.key, error = %failure, "Reviews request failed");
                return RawFetchResult::failed(SourceKind::Reviews, failure);
            }
        };

        let reviews = parse_reviews_page(&body);
        info!(entity = %entity.key, reviews = reviews.len(), "Fetched reviews");
        RawFetchResult::success(RawPayload::Reviews(reviews))
    }
}

/// Read review blocks out of a listing page.
///
/// Blocks without review text are dropped.
pub fn parse_reviews_page(body: &str) -> Vec<RawReview> {
    let document = Html::parse_document(body);
    let today = Utc::now().date_naive();

    document
        .select(&REVIEW_SELECTOR)
        .filter_map(|block| {
            let review_text = first_text(block, &TEXT_SELECTOR)?;
            let rating = first_text(block, &RATING_SELECTOR)
                .and_then(|text| parse_rating(&text))
                .unwrap_or(DEFAULT_RATING);

            Some(RawReview {
                rating,
                review_text: Some(review_text),
                job_title: first_text(block, &JOB_SELECTOR),
                location: first_text(block, &LOCATION_SELECTOR),
                review_date: Some(today),
                ..Default::default()
            })
        })
        .collect()
}

fn parse_rating(text: &str) -> Option<f64> {
    RATING_NUMBER
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Trimmed text of the first descendant matching `selector`, if non-empty.
fn first_text(block: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let element = block.select(selector).next()?;
    let text = element.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
