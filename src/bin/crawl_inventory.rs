use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dealer_inventory::config::AppConfig;
use dealer_inventory::fetcher::WebDriverLauncher;
use dealer_inventory::pipeline::InventoryPipeline;
use dealer_inventory::storage::InventoryStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = env::args().nth(1);
    let config = AppConfig::load_or_default(config_path.as_deref()).context("Failed to load configuration")?;

    let store = InventoryStore::from_config(&config.storage);
    let launcher = Arc::new(WebDriverLauncher::new(config.browser.clone()));
    let pipeline = InventoryPipeline::new(config, store.clone(), launcher);

    let summary = pipeline.run().await?;

    info!("=== CRAWL COMPLETE ===");
    info!("Run:       {}", summary.run_id);
    info!("Listings:  {}", summary.listings);
    info!("Enriched:  {}", summary.enriched);
    info!("Degraded:  {}", summary.failed);
    info!("Saved to:  {}", store.json_path().display());
    Ok(())
}
