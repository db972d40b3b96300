use anyhow::{Context, Result, bail};
use std::env;
use std::fs;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dealer_inventory::config::AppConfig;
use dealer_inventory::fetcher::OpenAiChatClient;
use dealer_inventory::processor::TextNormalizer;

/// Usage: normalize_html <file.html> [page]
#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        bail!("usage: normalize_html <file.html> [page]");
    };
    let page = match args.get(2) {
        Some(p) => p.parse::<usize>().with_context(|| format!("page must be a number: {}", p))?,
        None => 1,
    };

    let config = AppConfig::load_or_default(None).context("Failed to load configuration")?;
    let html = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    info!("Read {} characters from {}", html.chars().count(), path);

    let client = OpenAiChatClient::new(&config.llm).context("Failed to build model client")?;
    let normalizer = TextNormalizer::new(Arc::new(client), config.llm.system_prompt.clone())?;

    let records = normalizer
        .extract_and_structure_page(&html, config.llm.chunk_size_chars, page)
        .await;

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
