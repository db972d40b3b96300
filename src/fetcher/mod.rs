pub mod llm_client;
pub mod page_driver;
pub mod page_renderer;
pub mod webdriver_session;

#[cfg(test)]
pub mod mock_driver;

pub use llm_client::{ChatMessage, LanguageModel, OpenAiChatClient};
pub use page_driver::{ElementInfo, PageDriver, SessionLauncher};
pub use page_renderer::{PageRenderer, RenderedDocument, RendererSettings};
pub use webdriver_session::{WebDriverLauncher, WebDriverSession};
