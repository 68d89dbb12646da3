// Matches the DDL in repository::diesel_entity::SCHEMA_SQL.
// Dates and timestamps are stored as ISO-8601 text.

diesel::table! {
    entities (entity_key) {
        entity_key -> Text,
        display_name -> Text,
        ticker -> Nullable<Text>,
        industry -> Nullable<Text>,
        sector -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    financial_metrics (id) {
        id -> Integer,
        entity_key -> Text,
        revenue -> Nullable<Double>,
        net_income -> Nullable<Double>,
        total_debt -> Nullable<Double>,
        cash_flow -> Nullable<Double>,
        assets -> Nullable<Double>,
        liabilities -> Nullable<Double>,
        equity -> Nullable<Double>,
        filing_date -> Text,
        period_end_date -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    news_articles (id) {
        id -> Integer,
        display_name -> Text,
        title -> Text,
        url -> Text,
        published_date -> Text,
        source -> Text,
        content -> Nullable<Text>,
        sentiment_score -> Nullable<Double>,
        created_at -> Text,
    }
}

diesel::table! {
    employee_reviews (id) {
        id -> Integer,
        display_name -> Text,
        rating -> Double,
        review_text -> Nullable<Text>,
        job_title -> Nullable<Text>,
        location -> Nullable<Text>,
        review_date -> Nullable<Text>,
        pros -> Nullable<Text>,
        cons -> Nullable<Text>,
        work_life_balance -> Nullable<Double>,
        culture_values -> Nullable<Double>,
        career_opportunities -> Nullable<Double>,
        compensation_benefits -> Nullable<Double>,
        senior_management -> Nullable<Double>,
        created_at -> Text,
    }
}

diesel::joinable!(financial_metrics -> entities (entity_key));

diesel::allow_tables_to_appear_in_same_query!(
    entities,
    financial_metrics,
    news_articles,
    employee_reviews,
);
