use async_trait::async_trait;

use super::error::LedgerResult;
use super::event::CollectionEvent;
use super::query::{EventFilter, GroupKey, GroupStats};

/// Persistence capability for collection events
///
/// Storage adapters (SQLite, in-memory) implement this trait. The adapter is
/// the arbiter of batch id uniqueness: `insert` must fail with
/// `LedgerError::DuplicateBatchId` rather than overwrite.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Persist a new event
    async fn insert(&self, event: &CollectionEvent) -> LedgerResult<()>;

    /// Look up one event by its batch id
    async fn find_by_batch_id(&self, batch_id: &str) -> LedgerResult<Option<CollectionEvent>>;

    /// Number of events matching `filter`
    async fn count(&self, filter: &EventFilter) -> LedgerResult<u64>;

    /// Matching events, newest first, skipping `skip` and returning at most `limit`
    async fn find(
        &self,
        filter: &EventFilter,
        skip: u64,
        limit: u64,
    ) -> LedgerResult<Vec<CollectionEvent>>;

    /// Count, quantity sum and mean confidence per distinct `key` value
    /// among events matching `filter`, sorted by count descending
    async fn group_stats(&self, key: GroupKey, filter: &EventFilter)
        -> LedgerResult<Vec<GroupStats>>;
}
