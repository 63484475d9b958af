//! Catalog ingestion CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use catalog_ingest::{
    error::Result,
    models::Config,
    pipeline::{Ingestor, StatusTracker},
    services::PageFetcher,
    storage::{CatalogStore, JsonCatalogStore},
};

/// catalog-ingest - Storefront Catalog Ingestion
#[derive(Parser, Debug)]
#[command(
    name = "catalog-ingest",
    version,
    about = "Crawls a storefront catalog, translates it, and ingests it idempotently"
)]
struct Cli {
    /// Path to storage directory containing config and catalog files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one full ingestion: categories, products, images, translations
    Crawl,

    /// Validate configuration files
    Validate,

    /// Show current storage info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("catalog-ingest starting...");

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);

    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let config = Arc::new(config);
    let store = Arc::new(JsonCatalogStore::new(&cli.storage_dir));

    match cli.command {
        Command::Crawl => {
            config.validate()?;

            let fetcher = Arc::new(PageFetcher::new(&config.crawler)?);
            let store: Arc<dyn CatalogStore> = store.clone();
            let ingestor = Ingestor::new(Arc::clone(&config), fetcher, store)?;
            let tracker = StatusTracker::new();

            log::info!("Crawling {}", config.site.catalog_url);
            let result = ingestor.run_to_completion(&tracker).await?;

            log::info!("Crawl complete: {}", result.summary());
            for error in &result.errors {
                log::warn!("Category error: {}", error);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (crawler, site, translation, and image settings)");

            if config.translation.endpoint.trim().is_empty() {
                log::warn!("Translation endpoint not set; runs will store source text only");
            }

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());

            let stats = store.stats().await?;
            log::info!("Categories: {}", stats.categories);
            log::info!("Products: {}", stats.products);
            match stats.last_updated {
                Some(timestamp) => log::info!("Last updated: {}", timestamp),
                None => log::info!("No ingested data yet."),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
