use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Loosely-structured attributes the model pulled out of one HTML chunk.
/// Has no identity until the normalization pass assigns one.
pub type RawCandidate = Map<String, Value>;

/// A listing produced by the model normalization pass.
///
/// Model output is untrusted, so every field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedListing {
    pub id: Option<u32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<f64>,
    pub mileage: Option<u32>,
    pub color: Option<String>,
    pub vin: Option<String>,
    #[serde(rename = "stockNumber")]
    pub stock_number: Option<String>,
    pub condition: Option<String>,
    pub detail_url: Option<String>,
}
