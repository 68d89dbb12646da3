use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use corpscrape::config::load_settings;
use corpscrape::entities::{default_entities, load_entities};
use corpscrape::repository::{create_diesel_pool, DieselEntityRepository};
use corpscrape::scrapers::{build_adapters, ServiceLimiters};
use corpscrape::{JobContext, Metrics, Scheduler, StopSignal};

/// Collect filings, news and reviews for a list of companies.
#[derive(Debug, Parser)]
#[command(name = "corpscrape", version, about)]
struct Cli {
    /// Entity list (.json or .toml)
    #[arg(long, short = 'e', conflicts_with = "defaults")]
    entities: Option<PathBuf>,

    /// Use the built-in sample companies
    #[arg(long)]
    defaults: bool,

    /// Process at most this many entities
    #[arg(long, short = 'n')]
    limit: Option<usize>,

    /// Maximum entities processed concurrently
    #[arg(long, short = 'c')]
    concurrency: Option<usize>,

    /// Database file (overrides configuration)
    #[arg(long, env = "CORPSCRAPE_DATABASE")]
    database: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "corpscrape=debug" } else { "corpscrape=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut settings = load_settings().await;
    if let Some(database) = &cli.database {
        settings.database_filename = database.display().to_string();
    }
    if let Some(concurrency) = cli.concurrency {
        settings.max_concurrent = concurrency;
    }

    let mut entities = match &cli.entities {
        Some(path) => load_entities(path)
            .with_context(|| format!("loading entities from {}", path.display()))?,
        None => {
            if !cli.defaults {
                info!("No entity list given, using built-in companies");
            }
            default_entities()
        }
    };
    if let Some(limit) = cli.limit {
        entities.truncate(limit);
    }

    settings
        .ensure_directories()
        .context("creating data directory")?;
    let db_path = settings.database_path();
    let pool = create_diesel_pool(&db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    let store = DieselEntityRepository::new(pool);
    store.create_schema().await.context("creating schema")?;

    let metrics = Metrics::new();
    let limiters = ServiceLimiters::from_settings(&settings).context("invalid rate limit")?;
    let adapters =
        build_adapters(&settings, &limiters, &metrics).context("building HTTP clients")?;
    if settings.news_api_key.is_none() {
        warn!("GOOGLE_NEWS_API_KEY not set, news will be skipped");
    }

    let ctx = JobContext::new(adapters, Arc::new(store))
        .with_metrics(metrics.clone())
        .with_fetch_timeout(settings.fetch_timeout());
    let scheduler = Scheduler::new(ctx, settings.max_concurrent);

    let stop = scheduler.stop_signal();
    tokio::spawn(stop_on_ctrl_c(stop));

    info!(
        entities = entities.len(),
        database = %db_path.display(),
        "Starting collection"
    );
    let report = scheduler.run(entities).await;

    for record in &report.completed {
        info!(
            entity = %record.entity.key,
            name = %record.entity.display_name,
            metrics = record.financial_metrics.len(),
            news = record.news_articles.len(),
            reviews = record.employee_reviews.len(),
            "Collected"
        );
    }
    for failure in &report.failed {
        error!(entity = %failure.entity.key, error = %failure.error, "Failed");
    }
    if !report.skipped.is_empty() {
        warn!(skipped = report.skipped.len(), "Stopped before every entity ran");
    }

    metrics.log_summary();
    Ok(())
}

async fn stop_on_ctrl_c(stop: StopSignal) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Interrupt received, finishing in-flight entities");
        stop.stop();
    }
}
