//! Coordinate classification against India's bounding box
//!
//! The country test is a rectangle, not a polygon, so points in neighbouring
//! countries inside the rectangle classify as India. Regions are a further
//! ordered list of rectangles; they overlap, and the first match wins.

use super::event::GeoVerification;

/// Country label for coordinates inside the bounding box
pub const COUNTRY_INSIDE: &str = "India";
/// Country label for coordinates outside the bounding box
pub const COUNTRY_OUTSIDE: &str = "Outside India";
/// Region label for coordinates outside the bounding box
pub const REGION_UNKNOWN: &str = "Unknown";
/// Region label inside the bounding box when no sub-region matches
pub const REGION_OTHER: &str = "India (Other State)";

/// Inclusive latitude/longitude rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub const fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_lat
            && latitude <= self.max_lat
            && longitude >= self.min_lon
            && longitude <= self.max_lon
    }
}

/// India's approximate extent: 8.4°N to 37.6°N, 68.7°E to 97.25°E
pub const INDIA_BOUNDS: BoundingBox = BoundingBox::new(8.4, 37.6, 68.7, 97.25);

/// Sub-regions in match order. Order matters where rectangles overlap.
pub const REGIONS: &[(&str, BoundingBox)] = &[
    ("Delhi/Haryana", BoundingBox::new(28.0, 30.5, 76.8, 78.5)),
    ("Rajasthan", BoundingBox::new(26.0, 30.5, 70.0, 78.0)),
    ("Gujarat", BoundingBox::new(21.0, 26.0, 68.0, 74.5)),
    ("Maharashtra", BoundingBox::new(15.0, 21.0, 73.0, 80.5)),
    ("Karnataka/Andhra Pradesh", BoundingBox::new(11.0, 18.5, 74.0, 81.5)),
    ("Tamil Nadu/Kerala", BoundingBox::new(8.0, 13.0, 76.0, 80.5)),
    ("Odisha/Chhattisgarh", BoundingBox::new(18.0, 25.0, 80.0, 87.5)),
    ("West Bengal/Jharkhand", BoundingBox::new(22.0, 27.5, 85.0, 89.5)),
    ("Uttar Pradesh/Bihar", BoundingBox::new(24.0, 28.5, 80.0, 84.5)),
    ("Himachal Pradesh/Uttarakhand", BoundingBox::new(30.0, 37.6, 74.0, 80.0)),
];

/// Outcome of classifying a coordinate pair
#[derive(Debug, Clone, PartialEq)]
pub struct GeoClassification {
    pub is_within_region: bool,
    pub country: &'static str,
    pub region_label: &'static str,
}

impl From<GeoClassification> for GeoVerification {
    fn from(c: GeoClassification) -> Self {
        GeoVerification {
            country: c.country.to_string(),
            state: c.region_label.to_string(),
            is_within_india: c.is_within_region,
        }
    }
}

/// Classify a coordinate pair. Pure and total: callers range-check first.
pub fn classify(latitude: f64, longitude: f64) -> GeoClassification {
    if !INDIA_BOUNDS.contains(latitude, longitude) {
        return GeoClassification {
            is_within_region: false,
            country: COUNTRY_OUTSIDE,
            region_label: REGION_UNKNOWN,
        };
    }

    let region_label = REGIONS
        .iter()
        .find(|(_, bounds)| bounds.contains(latitude, longitude))
        .map(|(name, _)| *name)
        .unwrap_or(REGION_OTHER);

    GeoClassification {
        is_within_region: true,
        country: COUNTRY_INSIDE,
        region_label,
    }
}
