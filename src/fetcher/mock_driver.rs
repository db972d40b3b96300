//! Scripted in-memory browser used by unit tests.

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::page_driver::{ElementInfo, PageDriver, SessionLauncher};
use super::page_renderer::RendererSettings;
use crate::error::{Result, ScrapeError};

pub fn test_settings() -> RendererSettings {
    RendererSettings {
        ready_timeout: Duration::from_millis(10),
        poll_interval: Duration::from_millis(1),
        scroll_step_px: 650,
        scroll_pause: Duration::ZERO,
        max_scroll_steps: 500,
    }
}

#[derive(Debug, Default)]
pub struct MockLog {
    pub visited: Vec<String>,
    pub scrolls: Vec<u64>,
    pub clicks: usize,
    pub closed: bool,
}

/// Each route is a sequence of pages; clicking moves to the next page of the
/// current route and stays on the last one once the sequence is exhausted.
/// With `lagging_clicks(n)` the page source keeps showing the old page for
/// `n` reads after each click, like a grid that re-renders late.
#[derive(Default)]
pub struct MockDriver {
    routes: HashMap<String, Vec<String>>,
    failing_urls: HashSet<String>,
    failing_clicks: bool,
    panicking_urls: HashSet<String>,
    navigation_delay: Duration,
    click_lag: usize,
    stale: Option<(usize, usize)>,
    current: Option<(String, usize)>,
    heights: VecDeque<u64>,
    growth: Option<u64>,
    height_calls: u64,
    log: Arc<Mutex<MockLog>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            heights: VecDeque::from(vec![0]),
            ..Default::default()
        }
    }

    pub fn route(mut self, url: &str, pages: Vec<&str>) -> Self {
        self.routes
            .insert(url.to_string(), pages.into_iter().map(String::from).collect());
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }

    pub fn failing_clicks(mut self) -> Self {
        self.failing_clicks = true;
        self
    }

    /// `page_source` panics while `url` is loaded.
    pub fn panicking(mut self, url: &str) -> Self {
        self.panicking_urls.insert(url.to_string());
        self
    }

    pub fn navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = delay;
        self
    }

    pub fn lagging_clicks(mut self, reads: usize) -> Self {
        self.click_lag = reads;
        self
    }

    pub fn heights(mut self, heights: Vec<u64>) -> Self {
        self.heights = heights.into();
        self
    }

    pub fn growing_heights(mut self, growth: u64) -> Self {
        self.growth = Some(growth);
        self
    }

    pub fn log(&self) -> Arc<Mutex<MockLog>> {
        self.log.clone()
    }

    fn current_html(&self) -> Result<&str> {
        let (url, index) = self
            .current
            .as_ref()
            .ok_or_else(|| ScrapeError::Driver("no page loaded".to_string()))?;
        Ok(self.routes[url][*index].as_str())
    }

    fn select_first(&self, selector: &str) -> Result<Option<ElementInfo>> {
        let html = Html::parse_document(self.current_html()?);
        let selector = Selector::parse(selector)
            .map_err(|e| ScrapeError::Driver(format!("bad selector: {:?}", e)))?;
        Ok(html.select(&selector).next().map(|el| ElementInfo {
            class: el.value().attr("class").map(String::from),
            href: el.value().attr("href").map(String::from),
        }))
    }

    fn next_height(&mut self) -> u64 {
        self.height_calls += 1;
        if let Some(growth) = self.growth {
            return 1000 + (self.height_calls - 1) * growth;
        }
        if self.heights.len() > 1 {
            self.heights.pop_front().unwrap_or(0)
        } else {
            self.heights.front().copied().unwrap_or(0)
        }
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.log.lock().unwrap().visited.push(url.to_string());
        if !self.navigation_delay.is_zero() {
            tokio::time::sleep(self.navigation_delay).await;
        }
        if self.failing_urls.contains(url) || !self.routes.contains_key(url) {
            return Err(ScrapeError::navigation(format!("{}: unreachable", url)));
        }
        self.current = Some((url.to_string(), 0));
        self.stale = None;
        Ok(())
    }

    async fn wait_for_element(
        &mut self,
        selector: &str,
        timeout: Duration,
        _poll: Duration,
    ) -> Result<()> {
        match self.select_first(selector)? {
            Some(_) => Ok(()),
            None => Err(ScrapeError::PageLoadTimeout {
                selector: selector.to_string(),
                timeout,
            }),
        }
    }

    async fn execute(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        if script.contains("scrollHeight") {
            return Ok(json!(self.next_height()));
        }
        if script.contains("scrollTo") {
            let offset = args.first().and_then(Value::as_u64).unwrap_or(0);
            self.log.lock().unwrap().scrolls.push(offset);
        }
        Ok(Value::Null)
    }

    async fn page_source(&mut self) -> Result<String> {
        if let Some((url, _)) = &self.current {
            if self.panicking_urls.contains(url) {
                panic!("scripted panic reading {}", url);
            }
        }
        if let Some((index, reads)) = self.stale.take() {
            if reads > 0 {
                self.stale = Some((index, reads - 1));
                let (url, _) = self.current.as_ref().unwrap();
                return Ok(self.routes[url][index].clone());
            }
        }
        Ok(self.current_html()?.to_string())
    }

    async fn find_element(&mut self, selector: &str) -> Result<Option<ElementInfo>> {
        self.select_first(selector)
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        self.log.lock().unwrap().clicks += 1;
        if self.failing_clicks || self.select_first(selector)?.is_none() {
            return Err(ScrapeError::navigation(format!("click on `{}` failed", selector)));
        }
        if let Some((url, index)) = self.current.as_mut() {
            let last = self.routes[url.as_str()].len() - 1;
            if self.click_lag > 0 {
                self.stale = Some((*index, self.click_lag));
            }
            *index = (*index + 1).min(last);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Hands out one prepared `MockDriver`; later launches fail.
pub struct MockLauncher {
    driver: Mutex<Option<MockDriver>>,
}

impl MockLauncher {
    pub fn new(driver: MockDriver) -> Self {
        Self {
            driver: Mutex::new(Some(driver)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            driver: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SessionLauncher for MockLauncher {
    async fn launch(&self) -> Result<Box<dyn PageDriver>> {
        let driver = self.driver.lock().unwrap().take();
        match driver {
            Some(driver) => Ok(Box::new(driver)),
            None => Err(ScrapeError::SessionStart("chromedriver not reachable".to_string())),
        }
    }
}
