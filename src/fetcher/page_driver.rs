use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::error::Result;

/// What the crawler needs to know about a located element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementInfo {
    pub class: Option<String>,
    pub href: Option<String>,
}

impl ElementInfo {
    pub fn has_class(&self, class: &str) -> bool {
        self.class
            .as_deref()
            .map(|c| c.split_whitespace().any(|part| part == class))
            .unwrap_or(false)
    }
}

/// Browser capabilities used by the renderer, treated as a black box.
///
/// Implementations own one browser session; only the holder of the
/// `Box<dyn PageDriver>` may drive navigation.
#[async_trait]
pub trait PageDriver: Send {
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Poll every `poll` until `selector` matches, failing with
    /// `PageLoadTimeout` once `timeout` elapses.
    async fn wait_for_element(&mut self, selector: &str, timeout: Duration, poll: Duration)
        -> Result<()>;

    async fn execute(&mut self, script: &str, args: Vec<Value>) -> Result<Value>;

    async fn page_source(&mut self) -> Result<String>;

    /// `Ok(None)` when nothing matches `selector`.
    async fn find_element(&mut self, selector: &str) -> Result<Option<ElementInfo>>;

    async fn click(&mut self, selector: &str) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Starts browser sessions. Failure here is a resource-acquisition error.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageDriver>>;
}
