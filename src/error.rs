use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Failures raised while driving the browser, parsing pages or calling the model.
///
/// Most variants are contained at the smallest batch unit (one card, one
/// listing, one chunk). Only `SessionStart` and errors from the very first
/// inventory page are expected to reach the HTTP layer.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("page load timed out after {timeout:?} waiting for `{selector}`")]
    PageLoadTimeout { selector: String, timeout: Duration },

    #[error("parse failure: {0}")]
    ParseFailure(String),

    #[error("model call failed: {0}")]
    ModelCallFailure(String),

    #[error("navigation failed: {0}")]
    NavigationFailure(String),

    #[error("could not start browser session: {0}")]
    SessionStart(String),

    #[error("webdriver command failed: {0}")]
    Driver(String),
}

impl ScrapeError {
    pub fn parse(msg: impl Into<String>) -> Self {
        ScrapeError::ParseFailure(msg.into())
    }

    pub fn navigation(msg: impl Into<String>) -> Self {
        ScrapeError::NavigationFailure(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        ScrapeError::ModelCallFailure(msg.into())
    }
}

impl From<fantoccini::error::CmdError> for ScrapeError {
    fn from(e: fantoccini::error::CmdError) -> Self {
        ScrapeError::Driver(e.to_string())
    }
}

impl From<fantoccini::error::NewSessionError> for ScrapeError {
    fn from(e: fantoccini::error::NewSessionError) -> Self {
        ScrapeError::SessionStart(e.to_string())
    }
}

impl From<wreq::Error> for ScrapeError {
    fn from(e: wreq::Error) -> Self {
        ScrapeError::ModelCallFailure(e.to_string())
    }
}
