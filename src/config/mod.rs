pub mod app_config;
pub mod llm_config;

pub use app_config::*;
pub use llm_config::LlmConfig;
