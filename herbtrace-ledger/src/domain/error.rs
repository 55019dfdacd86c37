//! Domain error taxonomy for the collection event ledger

use std::time::Duration;
use thiserror::Error;

/// A submission failed validation; always correctable by the submitter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// One or more required fields are absent or blank
    #[error("All fields are required: missing {}", .fields.join(", "))]
    MissingFields { fields: Vec<&'static str> },

    #[error(
        "Invalid coordinates ({latitude}, {longitude}). Latitude must be between -90 and 90, longitude between -180 and 180"
    )]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Quantity must be greater than 0, got {0}")]
    InvalidQuantity(f64),

    #[error("{field} cannot exceed {max} characters (got {actual})")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

impl ValidationError {
    /// Field names this error refers to, for client-side highlighting
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            ValidationError::MissingFields { fields } => fields.clone(),
            ValidationError::InvalidCoordinates { latitude, longitude } => {
                let mut fields = Vec::new();
                if !(-90.0..=90.0).contains(latitude) {
                    fields.push("latitude");
                }
                if !(-180.0..=180.0).contains(longitude) {
                    fields.push("longitude");
                }
                fields
            }
            ValidationError::InvalidQuantity(_) => vec!["quantity"],
            ValidationError::FieldTooLong { field, .. } => vec![field],
        }
    }
}

/// Errors surfaced by the collection event store
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Collection event not found: {0}")]
    NotFound(String),

    /// Generated batch id collided with an existing record; retry regenerates it
    #[error("Duplicate batch ID: {0}")]
    DuplicateBatchId(String),

    #[error("Herb verification timed out after {} ms", .0.as_millis())]
    VerificationTimeout(Duration),

    #[error("Herb verification failed: {0}")]
    Verification(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] herbtrace_common::Error),
}

impl LedgerError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::DuplicateBatchId(_) | LedgerError::VerificationTimeout(_)
        )
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_fields() {
        let err = ValidationError::MissingFields {
            fields: vec!["farmerName", "imageUrl"],
        };
        assert_eq!(
            err.to_string(),
            "All fields are required: missing farmerName, imageUrl"
        );
    }

    #[test]
    fn test_invalid_coordinates_points_at_offending_axis() {
        let err = ValidationError::InvalidCoordinates {
            latitude: 95.0,
            longitude: 75.0,
        };
        assert_eq!(err.fields(), vec!["latitude"]);

        let err = ValidationError::InvalidCoordinates {
            latitude: 19.0,
            longitude: 200.0,
        };
        assert_eq!(err.fields(), vec!["longitude"]);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LedgerError::DuplicateBatchId("BATCH-1".into()).is_retryable());
        assert!(LedgerError::VerificationTimeout(Duration::from_secs(1)).is_retryable());
        assert!(!LedgerError::NotFound("BATCH-1".into()).is_retryable());
        assert!(!LedgerError::from(ValidationError::InvalidQuantity(0.0)).is_retryable());
    }
}
