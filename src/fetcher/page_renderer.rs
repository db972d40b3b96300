use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::page_driver::{ElementInfo, PageDriver};
use crate::config::BrowserConfig;
use crate::error::{Result, ScrapeError};

const SCROLL_HEIGHT_SCRIPT: &str = "return document.body.scrollHeight;";
const SCROLL_TO_SCRIPT: &str = "window.scrollTo(0, arguments[0]);";

#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
    pub scroll_step_px: u64,
    pub scroll_pause: Duration,
    pub max_scroll_steps: usize,
}

impl From<&BrowserConfig> for RendererSettings {
    fn from(config: &BrowserConfig) -> Self {
        Self {
            ready_timeout: config.ready_timeout(),
            poll_interval: config.poll_interval(),
            scroll_step_px: config.scroll_step_px.max(1),
            scroll_pause: config.scroll_pause(),
            max_scroll_steps: config.max_scroll_steps,
        }
    }
}

/// Markup of the page the session is currently showing.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub url: String,
    pub html: String,
}

/// Drives the exclusively-owned browser session: navigation, readiness
/// waits and the stepped scroll that forces lazy content to attach.
pub struct PageRenderer {
    driver: Box<dyn PageDriver>,
    settings: RendererSettings,
    current_url: String,
}

impl PageRenderer {
    pub fn new(driver: Box<dyn PageDriver>, settings: RendererSettings) -> Self {
        Self {
            driver,
            settings,
            current_url: String::new(),
        }
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub async fn navigate(&mut self, url: &str) -> Result<()> {
        info!("Navigating to {}", url);
        self.driver.goto(url).await?;
        self.current_url = url.to_string();
        Ok(())
    }

    /// Navigate and return the resulting markup.
    pub async fn render(&mut self, url: &str) -> Result<RenderedDocument> {
        self.navigate(url).await?;
        self.document().await
    }

    pub async fn document(&mut self) -> Result<RenderedDocument> {
        let html = self.driver.page_source().await?;
        Ok(RenderedDocument {
            url: self.current_url.clone(),
            html,
        })
    }

    pub async fn wait_for_ready(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let poll = self.settings.poll_interval;
        self.driver.wait_for_element(selector, timeout, poll).await
    }

    /// Wait for `selector` with the configured readiness timeout.
    pub async fn wait_for_marker(&mut self, selector: &str) -> Result<()> {
        let timeout = self.settings.ready_timeout;
        self.wait_for_ready(selector, timeout).await
    }

    /// Step the viewport down until the offset reaches the latest measured
    /// page height. Height is re-measured after every pause since lazy
    /// content grows the page. Returns the number of steps taken.
    pub async fn scroll_to_bottom(&mut self) -> Result<usize> {
        let mut last_height = self.page_height().await?;
        let mut offset: u64 = 0;
        let mut steps = 0;

        while offset < last_height {
            if steps >= self.settings.max_scroll_steps {
                warn!(
                    "Stopped scrolling after {} steps; page height still growing ({}px)",
                    steps, last_height
                );
                break;
            }

            self.driver
                .execute(SCROLL_TO_SCRIPT, vec![json!(offset)])
                .await?;
            sleep(self.settings.scroll_pause).await;

            offset += self.settings.scroll_step_px;
            last_height = self.page_height().await?;
            steps += 1;
        }

        debug!("Scrolled {} steps to {}px", steps, last_height);
        Ok(steps)
    }

    async fn page_height(&mut self) -> Result<u64> {
        let value = self.driver.execute(SCROLL_HEIGHT_SCRIPT, Vec::new()).await?;
        height_from_value(&value)
    }

    pub async fn find_element(&mut self, selector: &str) -> Result<Option<ElementInfo>> {
        self.driver.find_element(selector).await
    }

    pub async fn click(&mut self, selector: &str) -> Result<()> {
        self.driver.click(selector).await
    }

    pub async fn close(&mut self) -> Result<()> {
        self.driver.close().await
    }
}

fn height_from_value(value: &Value) -> Result<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|h| *h >= 0.0).map(|h| h as u64))
        .ok_or_else(|| ScrapeError::parse(format!("page height is not a number: {}", value)))
}
