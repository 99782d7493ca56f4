use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// HistoryKind
// ---------------------------------------------------------------------------

/// One variant per mutating operation that gets recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    MachineReset,
    AccountSwitch,
    QuickChange,
    HookApply,
    HookRestore,
}

impl HistoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryKind::MachineReset => "machine_reset",
            HistoryKind::AccountSwitch => "account_switch",
            HistoryKind::QuickChange => "quick_change",
            HistoryKind::HookApply => "hook_apply",
            HistoryKind::HookRestore => "hook_restore",
        }
    }
}

impl fmt::Display for HistoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HistoryKind {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "machine_reset" => Ok(HistoryKind::MachineReset),
            "account_switch" => Ok(HistoryKind::AccountSwitch),
            "quick_change" => Ok(HistoryKind::QuickChange),
            "hook_apply" => Ok(HistoryKind::HookApply),
            "hook_restore" => Ok(HistoryKind::HookRestore),
            _ => Err(crate::error::CoreError::InvalidHistoryKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryRecord
// ---------------------------------------------------------------------------

/// Append-only log entry written after every successful mutating action.
/// Persisted by the backend; the core never reads it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub kind: HistoryKind,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
    pub operator: String,
}

impl HistoryRecord {
    pub fn new(kind: HistoryKind, detail: impl Into<String>, operator: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            detail: detail.into(),
            timestamp: Utc::now(),
            operator: operator.into(),
        }
    }
}
