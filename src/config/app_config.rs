use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::LlmConfig;
use crate::models::Condition;

pub const DEFAULT_CONFIG_PATH: &str = "src/configs/dealer.toml";

/// Top-level configuration for the dealership crawler and its HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub browser: BrowserConfig,
    pub selectors: SelectorConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub placeholders: PlaceholderConfig,
}

/// The dealership being crawled
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    pub inventory_path: String,
    pub condition: Condition,
}

/// WebDriver session and page-driving behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
    pub chrome_args: Vec<String>,
    pub ready_timeout_seconds: u64,
    pub poll_interval_ms: u64,
    pub page_load_timeout_seconds: u64,
    pub scroll_step_px: u64,
    pub scroll_pause_ms: u64,
    pub max_scroll_steps: usize,
}

/// CSS selectors and label texts for inventory and detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub grid_ready: String,
    pub card: String,
    pub card_id_attr: String,
    pub placeholder_class: String,
    pub title: String,
    pub detail_link: String,
    pub vin: String,
    pub vin_label: String,
    pub stock_number: String,
    pub stock_label: String,
    pub price: String,
    pub next_page: String,
    pub disabled_class: String,
    pub detail_ready: String,
}

/// Where the enriched inventory is persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub json_path: String,
    pub csv_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Fixed specification values the detail pages do not provide.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    pub doors: String,
    pub cylinders: String,
    pub valves: String,
    pub compression: String,
    pub fuel_system: String,
    pub fuel_type: String,
    pub emission_rating: String,
    pub ground_clearance: String,
    pub warranty_basic: String,
    pub warranty_powertrain: String,
    pub warranty_roadside: String,
    pub build_location: String,
    pub country_of_origin: String,
    pub safety_features: Vec<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let mut config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        config.llm.load_credentials();
        Ok(config)
    }

    /// Layer built-in defaults, an optional TOML file and `DEALER_*`
    /// environment overrides (`DEALER_SERVER__PORT=9000`). A file that is
    /// named must exist.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            if !Path::new(path).is_file() {
                bail!("Config file not found: {}", path);
            }
            builder = builder.add_source(
                ::config::File::new(path, ::config::FileFormat::Toml).required(true),
            );
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("DEALER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to assemble configuration sources")?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.llm.load_credentials();
        Ok(config)
    }

    /// Binary entry point: an explicit path is required to exist, otherwise
    /// `DEFAULT_CONFIG_PATH` is used when present and defaults when not.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(Some(path)),
            None if Path::new(DEFAULT_CONFIG_PATH).is_file() => Self::load(Some(DEFAULT_CONFIG_PATH)),
            None => Self::load(None),
        }
    }

    pub fn inventory_url(&self) -> String {
        self.site.absolute_url(&self.site.inventory_path)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl SiteConfig {
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl BrowserConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_seconds)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Diamond Valley Honda".to_string(),
            base_url: "https://www.diamondvalleyhonda.com".to_string(),
            inventory_path: "/new-inventory/index.htm".to_string(),
            condition: Condition::New,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            chrome_args: vec![
                "--disable-gpu".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--no-sandbox".to_string(),
                "--enable-unsafe-swiftshader".to_string(),
            ],
            ready_timeout_seconds: 15,
            poll_interval_ms: 250,
            page_load_timeout_seconds: 30,
            scroll_step_px: 650,
            scroll_pause_ms: 2000,
            max_scroll_steps: 500,
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            grid_ready: "ul.vehicle-card-grid li.vehicle-card".to_string(),
            card: "ul.vehicle-card-grid li.vehicle-card[data-uuid]".to_string(),
            card_id_attr: "data-uuid".to_string(),
            placeholder_class: "placeholder-card".to_string(),
            title: "h2.vehicle-card-title span".to_string(),
            detail_link: "h2.vehicle-card-title a".to_string(),
            vin: "li.vin".to_string(),
            vin_label: "VIN".to_string(),
            stock_number: "li.stockNumber".to_string(),
            stock_label: "Stock #".to_string(),
            price: "dd.final-price span.price-value".to_string(),
            next_page: "li.pagination-next > a".to_string(),
            disabled_class: "disabled".to_string(),
            detail_ready: "body".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            json_path: "final_car_data.json".to_string(),
            csv_path: "final_car_data.csv".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            doors: "4".to_string(),
            cylinders: "4".to_string(),
            valves: "16".to_string(),
            compression: "10.6:1".to_string(),
            fuel_system: "Direct Injection".to_string(),
            fuel_type: "Regular Unleaded".to_string(),
            emission_rating: "ULEV-3".to_string(),
            ground_clearance: "5.1 in".to_string(),
            warranty_basic: "3 years/36,000 miles".to_string(),
            warranty_powertrain: "5 years/60,000 miles".to_string(),
            warranty_roadside: "3 years/36,000 miles".to_string(),
            build_location: "Marysville, OH".to_string(),
            country_of_origin: "USA".to_string(),
            safety_features: vec!["Lane departure".to_string(), "Security system".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_configs() {
        let config = AppConfig::default();
        assert_eq!(
            config.inventory_url(),
            "https://www.diamondvalleyhonda.com/new-inventory/index.htm"
        );
        assert_eq!(config.browser.scroll_step_px, 650);
        assert_eq!(config.browser.ready_timeout(), Duration::from_secs(15));
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.storage.json_path, "final_car_data.json");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [site]
            base_url = "https://dealer.example/"
            condition = "used"

            [browser]
            scroll_pause_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.site.condition, Condition::Used);
        assert_eq!(config.site.absolute_url("/used/index.htm"), "https://dealer.example/used/index.htm");
        assert_eq!(config.browser.scroll_pause_ms, 0);
        assert_eq!(config.browser.scroll_step_px, 650);
        assert_eq!(config.selectors.vin_label, "VIN");
        assert_eq!(config.placeholders.safety_features.len(), 2);
    }

    #[test]
    fn test_from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9100\n[llm]\nmodel = \"gpt-4o\"").unwrap();

        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.temperature, 0.7);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.selectors.next_page, "li.pagination-next > a");
    }

    #[test]
    fn test_load_rejects_missing_explicit_path() {
        let err = AppConfig::load(Some("does/not/exist.toml")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.toml"));
        assert!(AppConfig::load_or_default(Some("does/not/exist.toml")).is_err());
    }

    #[test]
    fn test_load_reads_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[server]\nport = 9200").unwrap();

        let config = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.server.port, 9200);
        assert_eq!(config.selectors.next_page, "li.pagination-next > a");
    }
}
