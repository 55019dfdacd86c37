//! Collection event entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Harvest location in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Result of the herb image verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiVerification {
    /// Confidence percentage in [0, 100]
    pub confidence: u8,
    pub verified_herb: String,
}

/// Country/region classification of the harvest location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoVerification {
    pub country: String,
    pub state: String,
    pub is_within_india: bool,
}

/// One farmer's harvest submission, with derived verification metadata
///
/// Created once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEvent {
    pub batch_id: String,
    pub farmer_name: String,
    pub herb_name: String,
    pub quantity: f64,
    pub location: Location,
    pub image_url: String,
    pub timestamp: DateTime<Utc>,
    pub ai_verification: AiVerification,
    pub geo_verification: GeoVerification,
}

impl CollectionEvent {
    /// "lat, long" rendering used by dashboards
    pub fn location_string(&self) -> String {
        format!("{}, {}", self.location.latitude, self.location.longitude)
    }
}
