//! Diesel ORM models for database tables.
//!
//! Record structs are read back from the database; `New*` structs borrow from
//! the domain records for insertion.

use diesel::prelude::*;

use crate::schema;

/// Entity row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::entities)]
#[diesel(primary_key(entity_key))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EntityRow {
    pub entity_key: String,
    pub display_name: String,
    pub ticker: Option<String>,
    pub industry: Option<String>,
    pub sector: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// New entity for upsert.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::entities)]
pub struct NewEntity<'a> {
    pub entity_key: &'a str,
    pub display_name: &'a str,
    pub ticker: Option<&'a str>,
    pub industry: Option<&'a str>,
    pub sector: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Financial metric row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::financial_metrics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FinancialMetricRow {
    pub id: i32,
    pub entity_key: String,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub total_debt: Option<f64>,
    pub cash_flow: Option<f64>,
    pub assets: Option<f64>,
    pub liabilities: Option<f64>,
    pub equity: Option<f64>,
    pub filing_date: String,
    pub period_end_date: String,
    pub created_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::financial_metrics)]
pub struct NewFinancialMetric<'a> {
    pub entity_key: &'a str,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub total_debt: Option<f64>,
    pub cash_flow: Option<f64>,
    pub assets: Option<f64>,
    pub liabilities: Option<f64>,
    pub equity: Option<f64>,
    pub filing_date: String,
    pub period_end_date: String,
    pub created_at: &'a str,
}

/// News article row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::news_articles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NewsArticleRow {
    pub id: i32,
    pub display_name: String,
    pub title: String,
    pub url: String,
    pub published_date: String,
    pub source: String,
    pub content: Option<String>,
    pub sentiment_score: Option<f64>,
    pub created_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::news_articles)]
pub struct NewNewsArticle<'a> {
    pub display_name: &'a str,
    pub title: &'a str,
    pub url: &'a str,
    pub published_date: String,
    pub source: &'a str,
    pub content: Option<&'a str>,
    pub sentiment_score: Option<f64>,
    pub created_at: &'a str,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::employee_reviews)]
pub struct NewEmployeeReview<'a> {
    pub display_name: &'a str,
    pub rating: f64,
    pub review_text: Option<&'a str>,
    pub job_title: Option<&'a str>,
    pub location: Option<&'a str>,
    pub review_date: Option<String>,
    pub pros: Option<&'a str>,
    pub cons: Option<&'a str>,
    pub work_life_balance: Option<f64>,
    pub culture_values: Option<f64>,
    pub career_opportunities: Option<f64>,
    pub compensation_benefits: Option<f64>,
    pub senior_management: Option<f64>,
    pub created_at: &'a str,
}
