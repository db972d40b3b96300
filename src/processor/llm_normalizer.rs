use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::text_utils::parse_price;
use crate::fetcher::{ChatMessage, LanguageModel};
use crate::models::{NormalizedListing, RawCandidate};

const EXTRACTION_PROMPT: &str = "You're a web scraping assistant. Extract all car listing info (as much detail as possible) from this raw HTML. \
Be lenient with formatting, focus on identifying cars and their key data like make, model, year, price, color, VIN, etc. \
Return them as a JSON array of raw unstructured objects, wrapped in triple backticks like ```json ... ```.";

const NORMALIZATION_PROMPT: &str = "You are a smart data normalizer. You will be given a list of raw car listings and your job is to convert them into the following clean structure:\n\n\
[{ \"id\": car_id, \"make\": make, \"model\": model, \"year\": year, \"price\": price, \
\"mileage\": 0, \"color\": color, \"vin\": vin, \"stockNumber\": stock, \
\"condition\": new_or_used, \"detail_url\": detail_url }]\n\n\
Return valid JSON wrapped in triple backticks.";

/// Split into pieces of at most `size` characters, ignoring markup
/// boundaries. A size of zero keeps the text whole.
pub fn chunk_html(html: &str, size: usize) -> Vec<String> {
    if html.is_empty() {
        return Vec::new();
    }
    if size == 0 {
        return vec![html.to_string()];
    }
    let chars: Vec<char> = html.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// Two-pass model extraction: raw candidates per chunk, then one
/// normalization pass over all of them.
pub struct TextNormalizer {
    model: Arc<dyn LanguageModel>,
    extraction_prompt: String,
    fenced_block: Regex,
}

impl TextNormalizer {
    /// `system_prompt`, when given, replaces the built-in extraction prompt.
    pub fn new(model: Arc<dyn LanguageModel>, system_prompt: Option<String>) -> Result<Self> {
        let fenced_block =
            Regex::new(r"(?s)```json\s*(.*?)\s*```").context("Failed to compile fenced block regex")?;

        Ok(Self {
            model,
            extraction_prompt: system_prompt.unwrap_or_else(|| EXTRACTION_PROMPT.to_string()),
            fenced_block,
        })
    }

    pub async fn extract_and_structure(&self, html: &str, chunk_size: usize) -> Vec<NormalizedListing> {
        self.extract_and_structure_page(html, chunk_size, 1).await
    }

    /// Never fails; an empty result means nothing could be extracted.
    ///
    /// When the extraction pass yields no candidates the normalization
    /// request is not sent at all and the result is empty.
    pub async fn extract_and_structure_page(
        &self,
        html: &str,
        chunk_size: usize,
        page: usize,
    ) -> Vec<NormalizedListing> {
        let chunks = chunk_html(html, chunk_size);
        let mut candidates: Vec<RawCandidate> = Vec::new();

        for (i, chunk) in chunks.iter().enumerate() {
            info!("🤖 Extracting raw data from batch {}/{}...", i + 1, chunks.len());
            let messages = [
                ChatMessage::system(self.extraction_prompt.as_str()),
                ChatMessage::user(format!(
                    "This is part {} of the HTML for page {}:\n\n{}",
                    i + 1,
                    page,
                    chunk
                )),
            ];

            let batch = self.call_structured(&messages).await;
            candidates.extend(batch.into_iter().filter_map(|value| match value {
                Value::Object(map) => Some(map),
                other => {
                    warn!("Dropping non-object candidate: {}", other);
                    None
                }
            }));
        }

        if candidates.is_empty() {
            warn!("⚠️ No raw car listings extracted; skipping normalization");
            return Vec::new();
        }
        info!("📦 Extracted {} raw car listings. Now structuring...", candidates.len());

        let payload = match serde_json::to_string(&candidates) {
            Ok(payload) => payload,
            Err(e) => {
                error!("❌ Could not serialize raw candidates: {}", e);
                return Vec::new();
            }
        };
        let messages = [
            ChatMessage::system(NORMALIZATION_PROMPT),
            ChatMessage::user(format!(
                "Here is a list of raw car listings extracted from HTML:\n\n{}",
                payload
            )),
        ];

        let structured: Vec<NormalizedListing> = self
            .call_structured(&messages)
            .await
            .iter()
            .filter_map(|value| {
                let listing = to_normalized(value);
                if listing.is_none() {
                    warn!("Dropping non-object normalized record: {}", value);
                }
                listing
            })
            .collect();

        info!("✅ Final structured listings count: {}", structured.len());
        structured
    }

    /// Model call plus parse; any failure is logged and yields nothing.
    async fn call_structured(&self, messages: &[ChatMessage]) -> Vec<Value> {
        match self.model.complete(messages).await {
            Ok(reply) => self.parse_model_records(&reply),
            Err(e) => {
                error!("❌ Model call failed: {}", e);
                Vec::new()
            }
        }
    }

    /// The first ```` ```json ```` block, or the whole reply when there is none.
    pub fn extract_json_payload<'a>(&self, reply: &'a str) -> &'a str {
        self.fenced_block
            .captures(reply)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(reply)
    }

    pub fn parse_model_records(&self, reply: &str) -> Vec<Value> {
        let payload = self.extract_json_payload(reply);
        match serde_json::from_str::<Value>(payload) {
            Ok(Value::Array(items)) => items,
            Ok(object @ Value::Object(_)) => vec![object],
            Ok(other) => {
                warn!("Model reply is JSON but not a record set: {}", other);
                Vec::new()
            }
            Err(e) => {
                warn!("Model reply is not valid JSON: {}", e);
                Vec::new()
            }
        }
    }
}

/// Lenient conversion of one model record. Numbers may arrive as strings
/// (`"$32,450"`), and a few key spellings are accepted.
pub fn to_normalized(value: &Value) -> Option<NormalizedListing> {
    let record = value.as_object()?;

    Some(NormalizedListing {
        id: number_field(record, &["id"]).map(|n| n as u32),
        make: text_field(record, &["make"]),
        model: text_field(record, &["model"]),
        year: number_field(record, &["year"]).map(|n| n as i32),
        price: number_field(record, &["price"]),
        mileage: number_field(record, &["mileage"]).map(|n| n as u32),
        color: text_field(record, &["color", "exteriorColor"]),
        vin: text_field(record, &["vin", "VIN"]),
        stock_number: text_field(record, &["stockNumber", "stock_number", "stock"]),
        condition: text_field(record, &["condition"]),
        detail_url: text_field(record, &["detail_url", "detailUrl", "url"]),
    })
}

fn lookup<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|v| !v.is_null())
}

fn text_field(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match lookup(record, keys)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number_field(record: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    match lookup(record, keys)? {
        Value::Number(n) => n.as_f64().filter(|n| *n >= 0.0),
        Value::String(s) => parse_price(s).ok(),
        _ => None,
    }
}
