//! Cost allocations: per-namespace resource spend over a time window.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::traits::{non_empty_params, null_as_default, ResourceFilter, ResourceKind};

/// One allocation record as served by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub namespace: String,
    pub resource_id: String,
    pub cpu_cost: f64,
    pub memory_cost: f64,
    pub gpu_cost: f64,
    pub total_cost: f64,
    pub start_time: String,
    pub end_time: String,
}

/// Allocation filters. `start`/`end` are RFC 3339 timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationFilters {
    #[serde(deserialize_with = "null_as_default")]
    pub namespace: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start: String,
    #[serde(deserialize_with = "null_as_default")]
    pub end: String,
}

/// Parse an RFC 3339 timestamp. Empty or malformed input yields `None`,
/// which callers treat as "does not exclude".
fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw).ok()
}

impl ResourceFilter for AllocationFilters {
    type Record = Allocation;

    const KIND: ResourceKind = ResourceKind::Allocations;

    fn query_params(&self) -> Vec<(&'static str, String)> {
        non_empty_params([
            ("namespace", self.namespace.as_str()),
            ("start", self.start.as_str()),
            ("end", self.end.as_str()),
        ])
    }

    fn matches(&self, record: &Allocation) -> bool {
        if !self.namespace.is_empty() && record.namespace != self.namespace {
            return false;
        }

        // Window overlap: drop records that ended before the window opened
        // or started after it closed.
        if let Some(window_start) = parse_timestamp(&self.start) {
            if parse_timestamp(&record.end_time).is_some_and(|ended| ended < window_start) {
                return false;
            }
        }
        if let Some(window_end) = parse_timestamp(&self.end) {
            if parse_timestamp(&record.start_time).is_some_and(|started| started > window_end) {
                return false;
            }
        }

        true
    }
}
