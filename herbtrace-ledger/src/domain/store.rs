//! Collection event lifecycle: create, fetch, list and aggregate
//!
//! Write path: validate → classify location + verify herb → assign batch id →
//! persist. Validation failures return before any classification,
//! verification or storage call is made.

use chrono::SubsecRound;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::batch_id::{is_batch_id, BatchIdGenerator};
use super::error::{LedgerError, LedgerResult};
use super::event::{CollectionEvent, GeoVerification, Location};
use super::geo;
use super::query::{EventFilter, EventPage, GroupKey, LedgerStats, Overview};
use super::repository::EventRepository;
use super::validation::{validate, Submission, ValidatedSubmission};
use super::verification::HerbVerifier;
use crate::pagination::PageRequest;

/// Attempts at inserting with a fresh batch id before giving up
pub const MAX_BATCH_ID_ATTEMPTS: u32 = 3;

/// Default bound on a single verification call
pub const DEFAULT_VERIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Domain service that handlers call
pub struct CollectionEventStore {
    repository: Arc<dyn EventRepository>,
    verifier: Arc<dyn HerbVerifier>,
    batch_ids: BatchIdGenerator,
    verification_timeout: Duration,
}

impl CollectionEventStore {
    pub fn new(repository: Arc<dyn EventRepository>, verifier: Arc<dyn HerbVerifier>) -> Self {
        Self {
            repository,
            verifier,
            batch_ids: BatchIdGenerator::new(),
            verification_timeout: DEFAULT_VERIFICATION_TIMEOUT,
        }
    }

    pub fn with_verification_timeout(mut self, timeout: Duration) -> Self {
        self.verification_timeout = timeout;
        self
    }

    /// Validate and create in one step
    pub async fn submit(&self, submission: &Submission) -> LedgerResult<CollectionEvent> {
        let validated = validate(submission)?;
        self.create(validated).await
    }

    /// Derive verification metadata, assign a batch id and persist
    ///
    /// A verification timeout or failure aborts the submission; nothing is
    /// stored with a placeholder result.
    pub async fn create(&self, submission: ValidatedSubmission) -> LedgerResult<CollectionEvent> {
        let geo_verification: GeoVerification =
            geo::classify(submission.latitude(), submission.longitude()).into();

        debug!(
            latitude = submission.latitude(),
            longitude = submission.longitude(),
            country = %geo_verification.country,
            state = %geo_verification.state,
            "Geo-check complete"
        );

        let ai_verification = tokio::time::timeout(
            self.verification_timeout,
            self.verifier
                .verify(submission.herb_name(), submission.image_url()),
        )
        .await
        .map_err(|_| {
            warn!(
                herb = submission.herb_name(),
                timeout_ms = self.verification_timeout.as_millis() as u64,
                "Herb verification timed out"
            );
            LedgerError::VerificationTimeout(self.verification_timeout)
        })??;

        // Millisecond precision, matching what storage keeps
        let timestamp = herbtrace_common::time::now().trunc_subsecs(3);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let (batch_id, _) = self.batch_ids.next(timestamp.timestamp_millis());

            let event = CollectionEvent {
                batch_id,
                farmer_name: submission.farmer_name().to_string(),
                herb_name: submission.herb_name().to_string(),
                quantity: submission.quantity(),
                location: Location {
                    latitude: submission.latitude(),
                    longitude: submission.longitude(),
                },
                image_url: submission.image_url().to_string(),
                timestamp,
                ai_verification: ai_verification.clone(),
                geo_verification: geo_verification.clone(),
            };

            match self.repository.insert(&event).await {
                Ok(()) => {
                    info!(
                        batch_id = %event.batch_id,
                        herb = %event.herb_name,
                        location = %event.location_string(),
                        within_india = event.geo_verification.is_within_india,
                        confidence = event.ai_verification.confidence,
                        "Collection event created"
                    );
                    return Ok(event);
                }
                Err(LedgerError::DuplicateBatchId(id)) if attempt < MAX_BATCH_ID_ATTEMPTS => {
                    warn!(batch_id = %id, attempt, "Batch id collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch one event by batch id
    pub async fn get_by_batch_id(&self, batch_id: &str) -> LedgerResult<CollectionEvent> {
        let batch_id = batch_id.trim();
        debug!(batch_id, "Getting collection event");

        // Nothing malformed was ever issued, so skip the lookup
        if !is_batch_id(batch_id) {
            return Err(LedgerError::NotFound(batch_id.to_string()));
        }

        self.repository
            .find_by_batch_id(batch_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(batch_id.to_string()))
    }

    /// One page of matching events, newest first
    pub async fn list(&self, filter: &EventFilter, page: PageRequest) -> LedgerResult<EventPage> {
        let (total_count, items) = tokio::try_join!(
            self.repository.count(filter),
            self.repository.find(filter, page.offset(), page.page_size),
        )?;

        debug!(
            total_count,
            returned = items.len(),
            page = page.page,
            "Listed collection events"
        );
        Ok(EventPage { items, total_count })
    }

    /// Ledger-wide overview plus herb and state distributions
    ///
    /// The state distribution only covers events inside India.
    pub async fn stats(&self) -> LedgerResult<LedgerStats> {
        let all = EventFilter::default();
        let india = EventFilter::within_india();

        let (total, within, herbs, states) = tokio::try_join!(
            self.repository.count(&all),
            self.repository.count(&india),
            self.repository.group_stats(GroupKey::HerbName, &all),
            self.repository.group_stats(GroupKey::State, &india),
        )?;

        Ok(LedgerStats {
            overview: Overview::new(total, within),
            herb_distribution: herbs.into_iter().map(Into::into).collect(),
            state_distribution: states.into_iter().map(Into::into).collect(),
        })
    }
}
