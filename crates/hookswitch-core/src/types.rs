use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Terminal result of one orchestrator invocation.
///
/// The presentation layer renders exactly one branch per variant and must
/// not inspect free-text error content except for `Fatal`'s display message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The patch was applied (or removed) and verified.
    Success,
    /// The target application is running; re-invoke with `force_kill = true`
    /// after user consent. The orchestrator never kills without it.
    NeedsConfirmation,
    /// Automatic entry-script discovery failed; a [`PendingAction`] was
    /// queued and the caller must supply a path.
    ///
    /// [`PendingAction`]: crate::pending::PendingAction
    NeedsManualPath,
    /// The OS refused to terminate the target process. Stable tag — callers
    /// pattern-match [`Outcome::tag`], not the message.
    PermissionRequired,
    /// Unclassified failure; the message is display-only.
    Fatal { message: String },
}

/// Tag callers may compare against when branching on [`Outcome::PermissionRequired`].
pub const PERMISSION_REQUIRED_TAG: &str = "permission-required";

impl Outcome {
    pub fn fatal(message: impl Into<String>) -> Self {
        Outcome::Fatal {
            message: message.into(),
        }
    }

    /// Stable machine-readable tag per variant.
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::NeedsConfirmation => "needs-confirmation",
            Outcome::NeedsManualPath => "needs-manual-path",
            Outcome::PermissionRequired => PERMISSION_REQUIRED_TAG,
            Outcome::Fatal { .. } => "fatal",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// HookStatus
// ---------------------------------------------------------------------------

/// Whether the runtime patch is present in the target's entry script.
///
/// `Unknown` exists only while a check is in flight; every check or mutating
/// call settles it to `Applied` or `NotApplied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStatus {
    Applied,
    NotApplied,
    Unknown,
}

impl Default for HookStatus {
    fn default() -> Self {
        HookStatus::Unknown
    }
}

impl HookStatus {
    pub fn from_flag(applied: bool) -> Self {
        if applied {
            HookStatus::Applied
        } else {
            HookStatus::NotApplied
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HookStatus::Applied => "applied",
            HookStatus::NotApplied => "not_applied",
            HookStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_tags_are_stable() {
        assert_eq!(Outcome::Success.tag(), "success");
        assert_eq!(Outcome::PermissionRequired.tag(), PERMISSION_REQUIRED_TAG);
        assert_eq!(Outcome::fatal("boom").tag(), "fatal");
    }

    #[test]
    fn outcome_serializes_with_tag_field() {
        let json = serde_json::to_string(&Outcome::NeedsManualPath).unwrap();
        assert!(json.contains("needs_manual_path"));
    }

    #[test]
    fn hook_status_settles_from_flag() {
        assert_eq!(HookStatus::from_flag(true), HookStatus::Applied);
        assert_eq!(HookStatus::from_flag(false), HookStatus::NotApplied);
    }
}
