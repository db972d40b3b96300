use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

/// Model-call settings for the text-to-structured normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub chunk_size_chars: usize,
    pub request_timeout_seconds: u64,
    // Names of the environment variables holding the secrets
    pub env_api_key: String,
    pub env_system_prompt: String,
    // Loaded from the environment, never from the file
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(skip)]
    pub system_prompt: Option<String>,
}

impl LlmConfig {
    /// Read the API key and optional system prompt from the environment.
    ///
    /// A missing key is logged and left empty; calls made without it fail
    /// individually and degrade to empty results.
    pub fn load_credentials(&mut self) {
        self.api_key = non_empty_var(&self.env_api_key);
        if self.api_key.is_none() {
            warn!(
                "Environment variable {} is not set; model calls will return no data",
                self.env_api_key
            );
        }
        self.system_prompt = non_empty_var(&self.env_system_prompt);
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-turbo".to_string(),
            temperature: 0.7,
            chunk_size_chars: 100_500,
            request_timeout_seconds: 120,
            env_api_key: "OPENAI_API_KEY".to_string(),
            env_system_prompt: "SYSTEM_PROMPT".to_string(),
            api_key: None,
            system_prompt: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url_joins_cleanly() {
        let config = LlmConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.chat_completions_url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_missing_credentials_are_none() {
        let mut config = LlmConfig {
            env_api_key: "DEALER_TEST_UNSET_KEY_91f3".to_string(),
            env_system_prompt: "DEALER_TEST_UNSET_PROMPT_91f3".to_string(),
            ..Default::default()
        };
        config.load_credentials();
        assert!(config.api_key.is_none());
        assert!(config.system_prompt.is_none());
    }
}
