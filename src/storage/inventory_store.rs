use anyhow::{Context, Result};
use polars::prelude::*;
use serde_json::Value;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::StorageConfig;
use crate::models::{Condition, EnrichedListing, SummaryListing};

/// JSON document plus CSV export of the latest crawl, both rewritten whole.
#[derive(Debug, Clone)]
pub struct InventoryStore {
    json_path: PathBuf,
    csv_path: PathBuf,
}

impl InventoryStore {
    pub fn new(json_path: impl Into<PathBuf>, csv_path: impl Into<PathBuf>) -> Self {
        Self {
            json_path: json_path.into(),
            csv_path: csv_path.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.json_path, &config.csv_path)
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn save(&self, records: &[EnrichedListing]) -> Result<()> {
        ensure_parent(&self.json_path)?;
        let json = serde_json::to_string_pretty(records).context("Failed to serialize listings")?;
        fs::write(&self.json_path, json)
            .with_context(|| format!("Failed to write {}", self.json_path.display()))?;

        ensure_parent(&self.csv_path)?;
        let mut df = listings_to_dataframe(records)?;
        let mut file = File::create(&self.csv_path)
            .with_context(|| format!("Failed to create {}", self.csv_path.display()))?;
        CsvWriter::new(&mut file)
            .finish(&mut df)
            .with_context(|| format!("Failed to write {}", self.csv_path.display()))?;

        info!(
            "💾 Saved {} listings to {} and {}",
            records.len(),
            self.json_path.display(),
            self.csv_path.display()
        );
        Ok(())
    }

    /// `None` when nothing has been persisted yet.
    pub fn load(&self) -> Result<Option<Value>> {
        if !self.json_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.json_path)
            .with_context(|| format!("Failed to read {}", self.json_path.display()))?;
        let value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.json_path.display()))?;
        Ok(Some(value))
    }

    pub fn load_listings(&self) -> Result<Option<Vec<EnrichedListing>>> {
        match self.load()? {
            Some(value) => {
                let listings = serde_json::from_value(value)
                    .with_context(|| format!("Unexpected layout in {}", self.json_path.display()))?;
                Ok(Some(listings))
            }
            None => Ok(None),
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display())),
        _ => Ok(()),
    }
}

/// One row per listing; `options` is kept as a JSON string.
pub fn listings_to_dataframe(records: &[EnrichedListing]) -> Result<DataFrame> {
    let mut options = Vec::with_capacity(records.len());
    for record in records {
        let value = match &record.options {
            Some(spec) => serde_json::to_string(spec).context("Failed to serialize options")?,
            None => "{}".to_string(),
        };
        options.push(value);
    }

    let columns: Vec<Column> = vec![
        Series::new("id".into(), records.iter().map(|r| r.listing.id).collect::<Vec<u32>>()).into(),
        text_column("make", records, |l| l.make.as_str()),
        text_column("model", records, |l| l.model.as_str()),
        Series::new("year".into(), records.iter().map(|r| r.listing.year).collect::<Vec<i32>>()).into(),
        Series::new("price".into(), records.iter().map(|r| r.listing.price).collect::<Vec<f64>>()).into(),
        Series::new("mileage".into(), records.iter().map(|r| r.listing.mileage).collect::<Vec<u32>>()).into(),
        text_column("color", records, |l| l.color.as_str()),
        text_column("vin", records, |l| l.vin.as_str()),
        text_column("stockNumber", records, |l| l.stock_number.as_str()),
        text_column("condition", records, |l| condition_label(l.condition)),
        text_column("detail_url", records, |l| l.detail_url.as_str()),
        Series::new("options".into(), options).into(),
        Series::new(
            "error".into(),
            records.iter().map(|r| r.error.clone()).collect::<Vec<Option<String>>>(),
        )
        .into(),
    ];

    DataFrame::new(columns).context("Failed to build listings frame")
}

fn text_column(
    name: &str,
    records: &[EnrichedListing],
    field: impl Fn(&SummaryListing) -> &str,
) -> Column {
    let values: Vec<String> = records.iter().map(|r| field(&r.listing).to_string()).collect();
    Series::new(name.into(), values).into()
}

fn condition_label(condition: Condition) -> &'static str {
    match condition {
        Condition::New => "new",
        Condition::Used => "used",
    }
}
