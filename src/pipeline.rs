use anyhow::{Context, Result};
use chrono::Utc;
use futures::FutureExt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::fetcher::{PageRenderer, RendererSettings, SessionLauncher};
use crate::models::{CrawlSummary, EnrichedListing};
use crate::processor::{DetailEnricher, ListingExtractor};
use crate::storage::InventoryStore;

/// Full crawl: every inventory page, then every detail page, then persist.
///
/// One browser session is acquired per run and threaded through both
/// phases. It is closed on every exit path, panics included.
pub struct InventoryPipeline {
    config: AppConfig,
    store: InventoryStore,
    launcher: Arc<dyn SessionLauncher>,
}

impl InventoryPipeline {
    pub fn new(config: AppConfig, store: InventoryStore, launcher: Arc<dyn SessionLauncher>) -> Self {
        Self {
            config,
            store,
            launcher,
        }
    }

    pub async fn run(&self) -> Result<CrawlSummary> {
        let started_at = Utc::now();
        info!("🚀 Starting inventory crawl for {}", self.config.site.name);

        let driver = self
            .launcher
            .launch()
            .await
            .context("Failed to start browser session")?;
        let mut renderer = PageRenderer::new(driver, RendererSettings::from(&self.config.browser));

        let outcome = AssertUnwindSafe(self.crawl(&mut renderer)).catch_unwind().await;

        if let Err(e) = renderer.close().await {
            warn!("⚠️ Failed to close browser session: {}", e);
        }

        let records = match outcome {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                error!("❌ Crawl failed: {:#}", e);
                return Err(e);
            }
            Err(payload) => panic::resume_unwind(payload),
        };

        self.store.save(&records).context("Failed to persist crawl results")?;

        let summary = CrawlSummary::new(started_at, &records);
        info!(
            "🎉 Crawl {} finished: {} listings, {} enriched, {} degraded",
            summary.run_id, summary.listings, summary.enriched, summary.failed
        );
        Ok(summary)
    }

    async fn crawl(&self, renderer: &mut PageRenderer) -> Result<Vec<EnrichedListing>> {
        let extractor = ListingExtractor::new(&self.config.site, &self.config.selectors)?;
        let listings = extractor
            .extract_all_listings(renderer, &self.config.inventory_url())
            .await
            .context("Failed to crawl inventory pages")?;

        let enricher = DetailEnricher::new(
            self.config.selectors.detail_ready.clone(),
            self.config.placeholders.clone(),
        )?;
        Ok(enricher.enrich(renderer, &listings).await)
    }
}
