use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{info, warn};

use super::page_driver::{ElementInfo, PageDriver, SessionLauncher};
use crate::config::BrowserConfig;
use crate::error::{Result, ScrapeError};

const CLICK_SCRIPT: &str = r#"
const el = document.querySelector(arguments[0]);
if (!el) { return false; }
el.click();
return true;
"#;

/// A WebDriver (chromedriver) session driven through fantoccini.
pub struct WebDriverSession {
    client: Client,
    closed: bool,
}

impl WebDriverSession {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            closed: false,
        }
    }
}

#[async_trait]
impl PageDriver for WebDriverSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .map_err(|e| ScrapeError::navigation(format!("{}: {}", url, e)))
    }

    async fn wait_for_element(
        &mut self,
        selector: &str,
        timeout: Duration,
        poll: Duration,
    ) -> Result<()> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .every(poll)
            .for_element(Locator::Css(selector))
            .await
        {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => Err(ScrapeError::PageLoadTimeout {
                selector: selector.to_string(),
                timeout,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn execute(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        Ok(self.client.execute(script, args).await?)
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    async fn find_element(&mut self, selector: &str) -> Result<Option<ElementInfo>> {
        match self.client.find(Locator::Css(selector)).await {
            Ok(element) => Ok(Some(ElementInfo {
                class: element.attr("class").await?,
                href: element.attr("href").await?,
            })),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let clicked = self
            .client
            .execute(CLICK_SCRIPT, vec![json!(selector)])
            .await
            .map_err(|e| ScrapeError::navigation(format!("click on `{}`: {}", selector, e)))?;

        if clicked.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(ScrapeError::navigation(format!(
                "no element matched `{}` when clicking",
                selector
            )))
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.client.clone().close().await?;
        info!("Browser session closed");
        Ok(())
    }
}

/// Connects to a running chromedriver and opens a Chrome session.
pub struct WebDriverLauncher {
    config: BrowserConfig,
}

impl WebDriverLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn capabilities(&self) -> Map<String, Value> {
        let mut args = self.config.chrome_args.clone();
        if self.config.headless {
            args.push("--headless=new".to_string());
        }

        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        caps
    }
}

#[async_trait]
impl SessionLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn PageDriver>> {
        info!("Connecting to webdriver at {}", self.config.webdriver_url);

        let client = ClientBuilder::native()
            .capabilities(self.capabilities())
            .connect(&self.config.webdriver_url)
            .await?;

        let timeouts =
            TimeoutConfiguration::new(None, Some(self.config.page_load_timeout()), None);
        if let Err(e) = client.update_timeouts(timeouts).await {
            warn!("Failed to configure session timeouts, closing session: {}", e);
            let _ = client.close().await;
            return Err(ScrapeError::SessionStart(e.to_string()));
        }

        info!("Webdriver session ready");
        Ok(Box::new(WebDriverSession::new(client)))
    }
}
