use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

/// Inventory condition advertised by the listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    New,
    Used,
}

/// One vehicle card from an inventory page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryListing {
    pub id: u32,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: f64,
    pub mileage: u32,
    pub color: String,
    pub vin: String,
    #[serde(rename = "stockNumber")]
    pub stock_number: String,
    pub condition: Condition,
    pub detail_url: String,
}

/// Feature list items sorted into the six fixed buckets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureBuckets {
    pub tech_features: Vec<String>,
    pub interior_features: Vec<String>,
    pub exterior_features: Vec<String>,
    pub performance_features: Vec<String>,
    pub standard_equipment: Vec<String>,
    pub optional_equipment: Vec<String>,
}

impl FeatureBuckets {
    pub fn total(&self) -> usize {
        self.tech_features.len()
            + self.interior_features.len()
            + self.exterior_features.len()
            + self.performance_features.len()
            + self.standard_equipment.len()
            + self.optional_equipment.len()
    }
}

/// Detail-page specification. Every text field holds `"Unknown"` or a fixed
/// placeholder when the page does not carry a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specification {
    pub trim: String,
    pub body_style: String,
    pub doors: String,
    pub engine: String,
    pub engine_size: String,
    pub cylinders: String,
    pub valves: String,
    pub horsepower: String,
    pub torque: String,
    pub compression: String,
    pub fuel_system: String,
    pub transmission: String,
    pub drivetrain: String,
    pub fuel_type: String,
    pub fuel_capacity: String,
    pub mpg_city: String,
    pub mpg_highway: String,
    pub emission_rating: String,
    pub seating_capacity: String,
    pub cargo_capacity: String,
    pub wheelbase: String,
    pub length: String,
    pub width: String,
    pub height: String,
    pub curb_weight: String,
    pub ground_clearance: String,
    pub warranty_basic: String,
    pub warranty_powertrain: String,
    pub warranty_roadside: String,
    pub build_location: String,
    pub country_of_origin: String,
    pub safety_features: Vec<String>,
    #[serde(flatten)]
    pub features: FeatureBuckets,
}

/// A summary listing merged with its detail-page specification.
///
/// `options` is `None` when enrichment failed; it serializes as `{}` and
/// `error` then carries the failure description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedListing {
    #[serde(flatten)]
    pub listing: SummaryListing,
    #[serde(with = "options_field")]
    pub options: Option<Specification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnrichedListing {
    pub fn enriched(listing: SummaryListing, options: Specification) -> Self {
        Self {
            listing,
            options: Some(options),
            error: None,
        }
    }

    pub fn degraded(listing: SummaryListing, error: impl Into<String>) -> Self {
        Self {
            listing,
            options: None,
            error: Some(error.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

mod options_field {
    use super::*;

    pub fn serialize<S: Serializer>(
        options: &Option<Specification>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match options {
            Some(spec) => spec.serialize(serializer),
            None => serde_json::Map::new().serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Specification>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            _ => serde_json::from_value(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Completion report returned by `GET /cars`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub message: String,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub listings: usize,
    pub enriched: usize,
    pub failed: usize,
}

impl CrawlSummary {
    pub fn new(started_at: DateTime<Utc>, records: &[EnrichedListing]) -> Self {
        let failed = records.iter().filter(|r| r.is_degraded()).count();
        Self {
            message: "All car details extracted and saved.".to_string(),
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            listings: records.len(),
            enriched: records.len() - failed,
            failed,
        }
    }
}
