//! Query parameters and aggregate shapes for reading the ledger

use herbtrace_common::text::fold_case;
use serde::Serialize;

use super::event::CollectionEvent;

/// List filter; unset options impose no constraint, set options are ANDed
///
/// Text options are case-insensitive substring matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub farmer_name: Option<String>,
    pub herb_name: Option<String>,
    /// Matched against `geoVerification.state`
    pub state: Option<String>,
    pub within_india: Option<bool>,
}

impl EventFilter {
    /// Build a filter, dropping blank text options
    pub fn new(
        farmer_name: Option<String>,
        herb_name: Option<String>,
        state: Option<String>,
    ) -> Self {
        Self {
            farmer_name: non_blank(farmer_name),
            herb_name: non_blank(herb_name),
            state: non_blank(state),
            within_india: None,
        }
    }

    /// Only events inside India's bounding box
    pub fn within_india() -> Self {
        Self {
            within_india: Some(true),
            ..Self::default()
        }
    }

    pub fn matches(&self, event: &CollectionEvent) -> bool {
        contains_ci(&event.farmer_name, self.farmer_name.as_deref())
            && contains_ci(&event.herb_name, self.herb_name.as_deref())
            && contains_ci(&event.geo_verification.state, self.state.as_deref())
            && self
                .within_india
                .map_or(true, |w| event.geo_verification.is_within_india == w)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(n) => fold_case(haystack).contains(&fold_case(n)),
    }
}

/// Grouping dimension for distribution statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    HerbName,
    State,
}

/// Per-group aggregate as returned by a repository
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub key: String,
    pub count: u64,
    pub total_quantity: f64,
    pub avg_confidence: f64,
}

/// One page of events plus the unpaged match count
#[derive(Debug, Clone, PartialEq)]
pub struct EventPage {
    pub items: Vec<CollectionEvent>,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_events: u64,
    pub events_within_india: u64,
    pub events_outside_india: u64,
    /// Percentage of events within India, two decimals; 0 for an empty ledger
    pub verification_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HerbDistribution {
    pub herb_name: String,
    pub count: u64,
    pub total_quantity: f64,
    pub avg_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDistribution {
    pub state: String,
    pub count: u64,
    pub total_quantity: f64,
    pub avg_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub overview: Overview,
    pub herb_distribution: Vec<HerbDistribution>,
    pub state_distribution: Vec<StateDistribution>,
}

impl From<GroupStats> for HerbDistribution {
    fn from(g: GroupStats) -> Self {
        Self {
            herb_name: g.key,
            count: g.count,
            total_quantity: g.total_quantity,
            avg_confidence: round2(g.avg_confidence),
        }
    }
}

impl From<GroupStats> for StateDistribution {
    fn from(g: GroupStats) -> Self {
        Self {
            state: g.key,
            count: g.count,
            total_quantity: g.total_quantity,
            avg_confidence: round2(g.avg_confidence),
        }
    }
}

impl Overview {
    pub fn new(total_events: u64, events_within_india: u64) -> Self {
        let verification_rate = if total_events == 0 {
            0.0
        } else {
            round2(events_within_india as f64 / total_events as f64 * 100.0)
        };

        Self {
            total_events,
            events_within_india,
            events_outside_india: total_events.saturating_sub(events_within_india),
            verification_rate,
        }
    }
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Order groups by count descending, then key ascending for stable output
pub fn sort_groups(groups: &mut [GroupStats]) {
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
}
