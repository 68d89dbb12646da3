//! Diesel-based entity repository for SQLite.
//!
//! One `save` writes an entity and all of its child records inside a single
//! immediate transaction.

use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use tracing::{debug, info};

use super::diesel_models::{
    EntityRow, FinancialMetricRow, NewEmployeeReview, NewEntity, NewFinancialMetric,
    NewNewsArticle, NewsArticleRow,
};
use super::diesel_pool::{run_blocking, SqlitePool};
use super::{format_date, parse_date, parse_datetime, EntityStore, SaveSummary, StoreError};
use crate::models::{
    Entity, EntityRecord, FinancialFigures, FinancialMetricRecord, NewsArticleRecord,
};
use crate::schema::{employee_reviews, entities, financial_metrics, news_articles};

/// DDL for every table and index. Safe to run repeatedly.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS entities (
    entity_key TEXT PRIMARY KEY NOT NULL CHECK (length(entity_key) = 10),
    display_name TEXT NOT NULL,
    ticker TEXT,
    industry TEXT,
    sector TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS financial_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_key TEXT NOT NULL REFERENCES entities(entity_key),
    revenue REAL,
    net_income REAL,
    total_debt REAL,
    cash_flow REAL,
    assets REAL,
    liabilities REAL,
    equity REAL,
    filing_date TEXT NOT NULL,
    period_end_date TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (entity_key, filing_date, period_end_date)
);

CREATE TABLE IF NOT EXISTS news_articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    display_name TEXT NOT NULL,
    title TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    published_date TEXT NOT NULL,
    source TEXT NOT NULL,
    content TEXT,
    sentiment_score REAL CHECK (sentiment_score IS NULL OR (sentiment_score >= -1 AND sentiment_score <= 1)),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS employee_reviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    display_name TEXT NOT NULL,
    rating REAL NOT NULL CHECK (rating >= 1 AND rating <= 5),
    review_text TEXT,
    job_title TEXT,
    location TEXT,
    review_date TEXT,
    pros TEXT,
    cons TEXT,
    work_life_balance REAL CHECK (work_life_balance IS NULL OR (work_life_balance >= 1 AND work_life_balance <= 5)),
    culture_values REAL CHECK (culture_values IS NULL OR (culture_values >= 1 AND culture_values <= 5)),
    career_opportunities REAL CHECK (career_opportunities IS NULL OR (career_opportunities >= 1 AND career_opportunities <= 5)),
    compensation_benefits REAL CHECK (compensation_benefits IS NULL OR (compensation_benefits >= 1 AND compensation_benefits <= 5)),
    senior_management REAL CHECK (senior_management IS NULL OR (senior_management >= 1 AND senior_management <= 5)),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_financial_metrics_entity ON financial_metrics(entity_key);
CREATE INDEX IF NOT EXISTS idx_financial_metrics_date ON financial_metrics(filing_date);
CREATE INDEX IF NOT EXISTS idx_news_articles_entity ON news_articles(display_name);
CREATE INDEX IF NOT EXISTS idx_news_articles_date ON news_articles(published_date);
CREATE INDEX IF NOT EXISTS idx_employee_reviews_entity ON employee_reviews(display_name);
"#;

/// Convert a database record to a domain model.
impl From<EntityRow> for Entity {
    fn from(row: EntityRow) -> Self {
        Entity {
            key: row.entity_key,
            display_name: row.display_name,
            ticker: row.ticker,
            industry: row.industry,
            sector: row.sector,
        }
    }
}

impl From<FinancialMetricRow> for FinancialMetricRecord {
    fn from(row: FinancialMetricRow) -> Self {
        FinancialMetricRecord {
            entity_key: row.entity_key,
            figures: FinancialFigures {
                revenue: row.revenue,
                net_income: row.net_income,
                total_debt: row.total_debt,
                cash_flow: row.cash_flow,
                assets: row.assets,
                liabilities: row.liabilities,
                equity: row.equity,
            },
            filing_date: parse_date(&row.filing_date),
            period_end_date: parse_date(&row.period_end_date),
        }
    }
}

impl From<NewsArticleRow> for NewsArticleRecord {
    fn from(row: NewsArticleRow) -> Self {
        NewsArticleRecord {
            display_name: row.display_name,
            title: row.title,
            url: row.url,
            published_at: parse_datetime(&row.published_date),
            source: row.source,
            content: row.content,
            sentiment_score: row.sentiment_score,
        }
    }
}

/// Diesel-based entity repository.
#[derive(Clone)]
pub struct DieselEntityRepository {
    pool: SqlitePool,
}

impl DieselEntityRepository {
    /// Create a new repository with an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create every table and index if missing.
    pub async fn create_schema(&self) -> Result<(), StoreError> {
        run_blocking(self.pool.clone(), |conn| conn.batch_execute(SCHEMA_SQL)).await?;
        debug!("Database schema verified");
        Ok(())
    }

    /// Get an entity by key.
    pub async fn get_entity(&self, key: &str) -> Result<Option<Entity>, StoreError> {
        let key = key.to_string();
        let row = run_blocking(self.pool.clone(), move |conn| {
            entities::table
                .find(&key)
                .select(EntityRow::as_select())
                .first(conn)
                .optional()
        })
        .await?;
        Ok(row.map(Entity::from))
    }

    /// Financial metrics for an entity, most recent filing first.
    pub async fn financial_metrics_for(
        &self,
        key: &str,
    ) -> Result<Vec<FinancialMetricRecord>, StoreError> {
        let key = key.to_string();
        let rows = run_blocking(self.pool.clone(), move |conn| {
            financial_metrics::table
                .filter(financial_metrics::entity_key.eq(&key))
                .order((
                    financial_metrics::filing_date.desc(),
                    financial_metrics::period_end_date.desc(),
                ))
                .select(FinancialMetricRow::as_select())
                .load(conn)
        })
        .await?;
        Ok(rows.into_iter().map(FinancialMetricRecord::from).collect())
    }

    /// Get a stored article by URL.
    pub async fn get_news_article(
        &self,
        url: &str,
    ) -> Result<Option<NewsArticleRecord>, StoreError> {
        let url = url.to_string();
        let row = run_blocking(self.pool.clone(), move |conn| {
            news_articles::table
                .filter(news_articles::url.eq(&url))
                .select(NewsArticleRow::as_select())
                .first(conn)
                .optional()
        })
        .await?;
        Ok(row.map(NewsArticleRecord::from))
    }

    /// Number of stored articles attributed to `display_name`.
    pub async fn news_count(&self, display_name: &str) -> Result<i64, StoreError> {
        let name = display_name.to_string();
        Ok(run_blocking(self.pool.clone(), move |conn| {
            news_articles::table
                .filter(news_articles::display_name.eq(&name))
                .count()
                .get_result(conn)
        })
        .await?)
    }

    /// Number of stored reviews attributed to `display_name`.
    pub async fn review_count(&self, display_name: &str) -> Result<i64, StoreError> {
        let name = display_name.to_string();
        Ok(run_blocking(self.pool.clone(), move |conn| {
            employee_reviews::table
                .filter(employee_reviews::display_name.eq(&name))
                .count()
                .get_result(conn)
        })
        .await?)
    }

    pub async fn count_entities(&self) -> Result<i64, StoreError> {
        Ok(run_blocking(self.pool.clone(), |conn| {
            entities::table.count().get_result(conn)
        })
        .await?)
    }
}

#[async_trait::async_trait]
impl EntityStore for DieselEntityRepository {
    async fn save(&self, record: &EntityRecord) -> Result<SaveSummary, StoreError> {
        let record = record.clone();
        let key = record.entity.key.clone();

        let summary = run_blocking(self.pool.clone(), move |conn| {
            conn.immediate_transaction(|conn| write_record(conn, &record))
        })
        .await?;

        info!(
            entity = %key,
            metrics = summary.financial_metrics,
            news = summary.news_articles,
            reviews = summary.employee_reviews,
            "Saved entity"
        );
        Ok(summary)
    }
}

/// Write one aggregate. Must run inside a transaction.
fn write_record(
    conn: &mut SqliteConnection,
    record: &EntityRecord,
) -> Result<SaveSummary, diesel::result::Error> {
    let now = Utc::now().to_rfc3339();
    let updated_at = record.last_updated.to_rfc3339();
    let entity = &record.entity;
    let mut summary = SaveSummary::default();

    summary.entities = diesel::insert_into(entities::table)
        .values(&NewEntity {
            entity_key: &entity.key,
            display_name: &entity.display_name,
            ticker: entity.ticker.as_deref(),
            industry: entity.industry.as_deref(),
            sector: entity.sector.as_deref(),
            created_at: &now,
            updated_at: &updated_at,
        })
        .on_conflict(entities::entity_key)
        .do_update()
        .set((
            entities::display_name.eq(excluded(entities::display_name)),
            entities::ticker.eq(excluded(entities::ticker)),
            entities::industry.eq(excluded(entities::industry)),
            entities::sector.eq(excluded(entities::sector)),
            entities::updated_at.eq(excluded(entities::updated_at)),
        ))
        .execute(conn)?;

    for metric in &record.financial_metrics {
        let figures = &metric.figures;
        summary.financial_metrics += diesel::insert_into(financial_metrics::table)
            .values(&NewFinancialMetric {
                entity_key: &metric.entity_key,
                revenue: figures.revenue,
                net_income: figures.net_income,
                total_debt: figures.total_debt,
                cash_flow: figures.cash_flow,
                assets: figures.assets,
                liabilities: figures.liabilities,
                equity: figures.equity,
                filing_date: format_date(metric.filing_date),
                period_end_date: format_date(metric.period_end_date),
                created_at: &now,
            })
            .on_conflict((
                financial_metrics::entity_key,
                financial_metrics::filing_date,
                financial_metrics::period_end_date,
            ))
            .do_update()
            .set((
                financial_metrics::revenue.eq(excluded(financial_metrics::revenue)),
                financial_metrics::net_income.eq(excluded(financial_metrics::net_income)),
                financial_metrics::total_debt.eq(excluded(financial_metrics::total_debt)),
                financial_metrics::cash_flow.eq(excluded(financial_metrics::cash_flow)),
                financial_metrics::assets.eq(excluded(financial_metrics::assets)),
                financial_metrics::liabilities.eq(excluded(financial_metrics::liabilities)),
                financial_metrics::equity.eq(excluded(financial_metrics::equity)),
            ))
            .execute(conn)?;
    }

    for article in &record.news_articles {
        summary.news_articles += diesel::insert_or_ignore_into(news_articles::table)
            .values(&NewNewsArticle {
                display_name: &article.display_name,
                title: &article.title,
                url: &article.url,
                published_date: article.published_at.to_rfc3339(),
                source: &article.source,
                content: article.content.as_deref(),
                sentiment_score: article.sentiment_score,
                created_at: &now,
            })
            .execute(conn)?;
    }

    for review in &record.employee_reviews {
        let sub = &review.sub_ratings;
        summary.employee_reviews += diesel::insert_into(employee_reviews::table)
            .values(&NewEmployeeReview {
                display_name: &review.display_name,
                rating: review.rating,
                review_text: review.review_text.as_deref(),
                job_title: review.job_title.as_deref(),
                location: review.location.as_deref(),
                review_date: review.review_date.map(format_date),
                pros: review.pros.as_deref(),
                cons: review.cons.as_deref(),
                work_life_balance: sub.work_life_balance,
                culture_values: sub.culture_values,
                career_opportunities: sub.career_opportunities,
                compensation_benefits: sub.compensation_benefits,
                senior_management: sub.senior_management,
                created_at: &now,
            })
            .execute(conn)?;
    }

    Ok(summary)
}
