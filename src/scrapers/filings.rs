//! SEC EDGAR filings adapter.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::America::New_York;
use scraper::Html;
use tracing::{debug, info, warn};

use super::extract::{
    document_text, extract_financial_figures, extract_period_end_date, find_period_end_date,
};
use super::{HttpClient, SourceAdapter, SourceFailure};
use crate::models::{Entity, RawFetchResult, RawFiling, RawPayload, SourceKind};

const DEFAULT_BASE_URL: &str = "https://www.sec.gov";

/// Form types requested from the company listing.
const FORM_TYPES: &str = "10-K,10-Q";

/// Default number of filings processed per entity.
pub const DEFAULT_MAX_FILINGS: usize = 5;

/// A filing as listed in the EDGAR company feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FilingRef {
    pub title: Option<String>,
    pub link: String,
    pub filing_date: Option<NaiveDate>,
}

/// Fetches recent annual and quarterly reports and pulls figures out of them.
pub struct FilingsAdapter {
    client: HttpClient,
    base_url: String,
    max_filings: usize,
}

impl FilingsAdapter {
    pub fn new(client: HttpClient, max_filings: usize) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_filings,
        }
    }

    /// Point the adapter at a different EDGAR host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// List filings for `key`, most recent first.
    pub async fn list_filings(&self, key: &str) -> Result<Vec<FilingRef>, SourceFailure> {
        let url = format!("{}/cgi-bin/browse-edgar", self.base_url);
        let query = [
            ("action", "getcompany".to_string()),
            ("CIK", key.to_string()),
            ("type", FORM_TYPES.to_string()),
            ("dateb", String::new()),
            ("owner", "include".to_string()),
            ("count", "100".to_string()),
            ("output", "atom".to_string()),
        ];

        let body = self.client.get_text(&url, &query).await?;
        parse_filing_feed(&body)
    }
}

#[async_trait]
impl SourceAdapter for FilingsAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Filings
    }

    async fn fetch(&self, entity: &Entity) -> RawFetchResult {
        let listing = match self.list_filings(&entity.key).await {
            Ok(listing) => listing,
            Err(failure) => {
                warn!(entity = %entity.key, error = %failure, "Filing listing failed");
                return RawFetchResult::failed(SourceKind::Filings, failure);
            }
        };

        let mut filings = Vec::new();
        for filing in listing.into_iter().take(self.max_filings) {
            let body = match self.client.get_text(&filing.link, &[]).await {
                Ok(body) => body,
                Err(failure) => {
                    warn!(
                        entity = %entity.key,
                        url = %filing.link,
                        error = %failure,
                        "Skipping filing"
                    );
                    continue;
                }
            };

            if let Some(raw) = parse_filing_document(&body, &filing) {
                filings.push(raw);
            }
        }

        info!(entity = %entity.key, filings = filings.len(), "Fetched filings");
        RawFetchResult::success(RawPayload::Filings(filings))
    }
}

/// Read filing references out of an EDGAR Atom feed.
pub fn parse_filing_feed(body: &str) -> Result<Vec<FilingRef>, SourceFailure> {
    let feed = feed_rs::parser::parse(body.as_bytes())
        .map_err(|e| SourceFailure::Parse(format!("filing feed: {e}")))?;

    Ok(feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone())?;
            Some(FilingRef {
                title: entry.title.map(|t| t.content),
                link,
                filing_date: entry.updated.or(entry.published).map(edgar_date),
            })
        })
        .collect())
}

/// Calendar date of an EDGAR timestamp in Eastern time.
///
/// feed-rs normalises to UTC, which would push evening filings onto the next day.
fn edgar_date(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.with_timezone(&New_York).date_naive()
}

/// Extract figures from one filing document.
///
/// Returns `None` when no strategy finds anything.
pub fn parse_filing_document(body: &str, filing: &FilingRef) -> Option<RawFiling> {
    let document = Html::parse_document(body);
    let (strategy, figures) = extract_financial_figures(&document)?;
    debug!(url = %filing.link, strategy, "Extracted filing figures");

    let text = document_text(&document);
    let period_end_date = match filing.filing_date {
        Some(filing_date) => Some(extract_period_end_date(&text, filing_date)),
        None => find_period_end_date(&text),
    };

    Some(RawFiling {
        filing_date: filing.filing_date,
        period_end_date,
        figures,
        source_url: filing.link.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::rate_limiter::{Rate, RateLimiter};
    use std::time::Duration;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>APPLE INC.  (0000320193)</title>
  <id>urn:tag:sec.gov,2008:company=0000320193</id>
  <updated>2024-02-02T06:01:05-05:00</updated>
  <entry>
    <title>10-Q  - Quarterly report</title>
    <link rel="alternate" type="text/html" href="https://www.sec.gov/Archives/edgar/data/320193/q1.htm"/>
    <id>urn:tag:sec.gov,2008:accession-number=0000320193-24-000006</id>
    <updated>2024-02-02T06:01:05-05:00</updated>
  </entry>
  <entry>
    <title>10-K  - Annual report</title>
    <link rel="alternate" type="text/html" href="https://www.sec.gov/Archives/edgar/data/320193/k.htm"/>
    <id>urn:tag:sec.gov,2008:accession-number=0000320193-23-000106</id>
    <updated>2023-11-03T06:01:36-04:00</updated>
  </entry>
</feed>"#;

    fn filing(date: Option<NaiveDate>) -> FilingRef {
        FilingRef {
            title: None,
            link: "https://www.sec.gov/Archives/doc.htm".to_string(),
            filing_date: date,
        }
    }

    #[test]
    fn test_parse_filing_feed() {
        let filings = parse_filing_feed(FEED).unwrap();
        assert_eq!(filings.len(), 2);
        assert_eq!(
            filings[0].link,
            "https://www.sec.gov/Archives/edgar/data/320193/q1.htm"
        );
        assert_eq!(filings[0].filing_date, NaiveDate::from_ymd_opt(2024, 2, 2));
        assert_eq!(filings[1].filing_date, NaiveDate::from_ymd_opt(2023, 11, 3));
        assert!(filings[1].title.as_deref().unwrap().contains("10-K"));
    }

    #[test]
    fn test_evening_filings_keep_their_eastern_date() {
        let feed = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>APPLE INC.  (0000320193)</title>
  <id>urn:tag:sec.gov,2008:company=0000320193</id>
  <updated>2023-11-03T21:30:00-04:00</updated>
  <entry>
    <title>8-K  - Current report</title>
    <link rel="alternate" type="text/html" href="https://www.sec.gov/Archives/edgar/data/320193/8k.htm"/>
    <id>urn:tag:sec.gov,2008:accession-number=0000320193-23-000100</id>
    <updated>2023-11-03T21:30:00-04:00</updated>
  </entry>
  <entry>
    <title>8-K  - Current report</title>
    <link rel="alternate" type="text/html" href="https://www.sec.gov/Archives/edgar/data/320193/8k-2.htm"/>
    <id>urn:tag:sec.gov,2008:accession-number=0000320193-24-000010</id>
    <updated>2024-02-02T23:45:00-05:00</updated>
  </entry>
</feed>"#;
        let filings = parse_filing_feed(feed).unwrap();
        assert_eq!(filings[0].filing_date, NaiveDate::from_ymd_opt(2023, 11, 3));
        assert_eq!(filings[1].filing_date, NaiveDate::from_ymd_opt(2024, 2, 2));

        let raw = parse_filing_document(
            "<table><tr><td>Total assets</td><td>352,583</td></tr></table>",
            &filings[0],
        )
        .unwrap();
        assert_eq!(raw.period_end_date, NaiveDate::from_ymd_opt(2023, 11, 3));
    }

    #[test]
    fn test_parse_filing_feed_rejects_garbage() {
        assert!(matches!(
            parse_filing_feed("not a feed"),
            Err(SourceFailure::Parse(_))
        ));
    }

    #[test]
    fn test_parse_filing_document_uses_period_from_text() {
        let body = r#"<html><body>
            <p>For the period ended September 30, 2023</p>
            <table><tr><td>Total net sales</td><td>$383,285</td></tr></table>
        </body></html>"#;
        let raw = parse_filing_document(body, &filing(NaiveDate::from_ymd_opt(2023, 11, 3))).unwrap();
        assert_eq!(raw.period_end_date, NaiveDate::from_ymd_opt(2023, 9, 30));
        assert_eq!(raw.filing_date, NaiveDate::from_ymd_opt(2023, 11, 3));
        assert_eq!(raw.figures.revenue, Some(383_285.0));
    }

    #[test]
    fn test_parse_filing_document_falls_back_to_filing_date() {
        let body = "<table><tr><td>Total assets</td><td>352,583</td></tr></table>";
        let date = NaiveDate::from_ymd_opt(2023, 11, 3);
        let raw = parse_filing_document(body, &filing(date)).unwrap();
        assert_eq!(raw.period_end_date, date);
    }

    #[test]
    fn test_parse_filing_document_without_figures() {
        assert!(parse_filing_document("<p>Exhibit index</p>", &filing(None)).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_listing_is_reported() {
        let limiter = RateLimiter::new("sec_edgar", Rate::PerSecond(100.0)).unwrap();
        let client = HttpClient::builder(SourceKind::Filings, limiter)
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let adapter = FilingsAdapter::new(client, DEFAULT_MAX_FILINGS)
            .with_base_url("http://127.0.0.1:9/");

        let result = adapter.fetch(&Entity::new("0000320193", "Apple Inc.")).await;
        assert!(!result.is_success());
        assert!(result.payload.is_empty());
        assert_eq!(result.source, SourceKind::Filings);
    }
}
