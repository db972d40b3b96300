use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dealer_inventory::config::AppConfig;
use dealer_inventory::fetcher::WebDriverLauncher;
use dealer_inventory::pipeline::InventoryPipeline;
use dealer_inventory::server::{AppState, build_app};
use dealer_inventory::storage::InventoryStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = env::args().nth(1);
    let config = AppConfig::load_or_default(config_path.as_deref()).context("Failed to load configuration")?;
    info!("Loaded configuration for {} ({})", config.site.name, config.inventory_url());

    let store = InventoryStore::from_config(&config.storage);
    let launcher = Arc::new(WebDriverLauncher::new(config.browser.clone()));
    let address = config.bind_address();
    let pipeline = InventoryPipeline::new(config, store.clone(), launcher);

    let app = build_app(AppState::new(pipeline, store));
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("🚀 Serving inventory API on http://{}", address);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
