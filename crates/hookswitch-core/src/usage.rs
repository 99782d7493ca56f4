use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// ModelUsage / UsageSnapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub used: u64,
    /// `None` means the plan reports no cap for this model.
    pub cap: Option<u64>,
}

/// Per-model usage as last known by the store.
///
/// A failed refresh keeps the stale `per_model` map and records the failure
/// kind, so the UI never flashes to empty on a transient error. `error_kind`
/// is cleared only by a fully successful refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub per_model: BTreeMap<String, ModelUsage>,
    /// Stable error kind of the last failed refresh (`BackendError::kind`),
    /// `None` after a successful one.
    pub error_kind: Option<String>,
    /// Timestamp of the last *successful* refresh.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl UsageSnapshot {
    pub fn record_success(&mut self, per_model: BTreeMap<String, ModelUsage>, at: DateTime<Utc>) {
        self.per_model = per_model;
        self.error_kind = None;
        self.fetched_at = Some(at);
    }

    /// Keep the stale map, remember only the failure kind.
    pub fn record_failure(&mut self, kind: &str) {
        self.error_kind = Some(kind.to_string());
    }

    pub fn is_stale(&self) -> bool {
        self.error_kind.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
