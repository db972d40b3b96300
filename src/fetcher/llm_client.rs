use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use wreq::Client;

use crate::config::LlmConfig;
use crate::error::{Result, ScrapeError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A text-completion service. Returns the raw reply text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiChatClient {
    client: Client,
    url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl OpenAiChatClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            url: config.chat_completions_url(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ScrapeError::model("no API key configured"))?;

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        debug!("Calling {} with {} messages", self.model, messages.len());
        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScrapeError::model(format!("HTTP {}: {}", status, body)));
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ScrapeError::model("response has no choices"))
    }
}
