//! Submission validation
//!
//! A `ValidatedSubmission` can only be obtained through [`validate`], so the
//! store never classifies, verifies or persists unchecked input.

use serde::Deserialize;

use super::error::ValidationError;

pub const MAX_FARMER_NAME_CHARS: usize = 100;
pub const MAX_HERB_NAME_CHARS: usize = 50;

/// Raw harvest submission as received from a client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub farmer_name: Option<String>,
    pub herb_name: Option<String>,
    pub quantity: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_url: Option<String>,
}

/// Submission that passed every field and range check
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission {
    farmer_name: String,
    herb_name: String,
    quantity: f64,
    latitude: f64,
    longitude: f64,
    image_url: String,
}

impl ValidatedSubmission {
    pub fn farmer_name(&self) -> &str {
        &self.farmer_name
    }

    pub fn herb_name(&self) -> &str {
        &self.herb_name
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }
}

fn present_text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Zero counts as an unset coordinate
fn present_coordinate(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

/// Check a submission, failing fast on the first class of problem found
///
/// Order: required fields, coordinate ranges, quantity, text lengths.
/// Missing fields are all reported together.
pub fn validate(submission: &Submission) -> Result<ValidatedSubmission, ValidationError> {
    let farmer_name = present_text(&submission.farmer_name);
    let herb_name = present_text(&submission.herb_name);
    let image_url = present_text(&submission.image_url);
    let latitude = present_coordinate(submission.latitude);
    let longitude = present_coordinate(submission.longitude);

    let mut missing = Vec::new();
    if farmer_name.is_none() {
        missing.push("farmerName");
    }
    if herb_name.is_none() {
        missing.push("herbName");
    }
    if submission.quantity.is_none() {
        missing.push("quantity");
    }
    if latitude.is_none() {
        missing.push("latitude");
    }
    if longitude.is_none() {
        missing.push("longitude");
    }
    if image_url.is_none() {
        missing.push("imageUrl");
    }

    let (
        Some(farmer_name),
        Some(herb_name),
        Some(quantity),
        Some(latitude),
        Some(longitude),
        Some(image_url),
    ) = (
        farmer_name,
        herb_name,
        submission.quantity,
        latitude,
        longitude,
        image_url,
    )
    else {
        return Err(ValidationError::MissingFields { fields: missing });
    };

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(ValidationError::InvalidCoordinates {
            latitude,
            longitude,
        });
    }

    if !(quantity.is_finite() && quantity > 0.0) {
        return Err(ValidationError::InvalidQuantity(quantity));
    }

    check_length("farmerName", farmer_name, MAX_FARMER_NAME_CHARS)?;
    check_length("herbName", herb_name, MAX_HERB_NAME_CHARS)?;

    Ok(ValidatedSubmission {
        farmer_name: farmer_name.to_string(),
        herb_name: herb_name.to_string(),
        quantity,
        latitude,
        longitude,
        image_url: image_url.to_string(),
    })
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::FieldTooLong { field, max, actual });
    }
    Ok(())
}
