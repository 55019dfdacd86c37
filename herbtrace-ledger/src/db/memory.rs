//! In-process event repository
//!
//! Used by tests and by `--in-memory` runs. Contents are lost on exit.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::domain::query::sort_groups;
use crate::domain::{
    CollectionEvent, EventFilter, EventRepository, GroupKey, GroupStats, LedgerError,
    LedgerResult,
};

#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    events: RwLock<Vec<CollectionEvent>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(a: &CollectionEvent, b: &CollectionEvent) -> std::cmp::Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.batch_id.cmp(&a.batch_id))
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn insert(&self, event: &CollectionEvent) -> LedgerResult<()> {
        let mut events = self.events.write().await;
        if events.iter().any(|e| e.batch_id == event.batch_id) {
            return Err(LedgerError::DuplicateBatchId(event.batch_id.clone()));
        }
        events.push(event.clone());
        Ok(())
    }

    async fn find_by_batch_id(&self, batch_id: &str) -> LedgerResult<Option<CollectionEvent>> {
        let events = self.events.read().await;
        Ok(events.iter().find(|e| e.batch_id == batch_id).cloned())
    }

    async fn count(&self, filter: &EventFilter) -> LedgerResult<u64> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|e| filter.matches(e)).count() as u64)
    }

    async fn find(
        &self,
        filter: &EventFilter,
        skip: u64,
        limit: u64,
    ) -> LedgerResult<Vec<CollectionEvent>> {
        let events = self.events.read().await;
        let mut matching: Vec<&CollectionEvent> =
            events.iter().filter(|e| filter.matches(e)).collect();
        matching.sort_by(|a, b| newest_first(a, b));

        Ok(matching
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn group_stats(
        &self,
        key: GroupKey,
        filter: &EventFilter,
    ) -> LedgerResult<Vec<GroupStats>> {
        let events = self.events.read().await;

        // key -> (count, quantity sum, confidence sum)
        let mut groups: BTreeMap<&str, (u64, f64, f64)> = BTreeMap::new();
        for event in events.iter().filter(|e| filter.matches(e)) {
            let group = match key {
                GroupKey::HerbName => event.herb_name.as_str(),
                GroupKey::State => event.geo_verification.state.as_str(),
            };
            let entry = groups.entry(group).or_default();
            entry.0 += 1;
            entry.1 += event.quantity;
            entry.2 += f64::from(event.ai_verification.confidence);
        }

        let mut stats: Vec<GroupStats> = groups
            .into_iter()
            .map(|(group, (count, total_quantity, confidence_sum))| GroupStats {
                key: group.to_string(),
                count,
                total_quantity,
                avg_confidence: confidence_sum / count as f64,
            })
            .collect();
        sort_groups(&mut stats);
        Ok(stats)
    }
}
