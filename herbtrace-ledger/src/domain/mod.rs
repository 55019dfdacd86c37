//! Collection event domain: records, checks, classification and the store

pub mod batch_id;
pub mod error;
pub mod event;
pub mod geo;
pub mod query;
pub mod repository;
pub mod store;
pub mod validation;
pub mod verification;

pub use error::{LedgerError, LedgerResult, ValidationError};
pub use event::{AiVerification, CollectionEvent, GeoVerification, Location};
pub use query::{EventFilter, EventPage, GroupKey, GroupStats, LedgerStats};
pub use repository::EventRepository;
pub use store::CollectionEventStore;
pub use validation::{validate, Submission, ValidatedSubmission};
pub use verification::{HerbVerifier, SimulatedVerifier};
