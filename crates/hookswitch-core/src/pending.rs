use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::io;

// ---------------------------------------------------------------------------
// PendingAction
// ---------------------------------------------------------------------------

/// A deferred hook operation, queued when the orchestrator cannot resolve
/// the target's entry script on its own.
///
/// Closed set so the replay dispatch in [`Session::resolve_entry_location`]
/// is exhaustively checked.
///
/// [`Session::resolve_entry_location`]: crate::session::Session::resolve_entry_location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingAction {
    ApplyHook { force_kill: bool },
    RestoreHook { force_kill: bool },
}

impl PendingAction {
    pub fn kind_str(self) -> &'static str {
        match self {
            PendingAction::ApplyHook { .. } => "apply_hook",
            PendingAction::RestoreHook { .. } => "restore_hook",
        }
    }
}

// ---------------------------------------------------------------------------
// PendingSlot
// ---------------------------------------------------------------------------

/// Single-slot deferred-action holder: at most one outstanding action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingSlot(Option<PendingAction>);

impl PendingSlot {
    /// Queue an action, overwriting any existing entry (last writer wins).
    pub fn enqueue(&mut self, action: PendingAction) {
        if let Some(prev) = self.0.replace(action) {
            tracing::debug!(replaced = prev.kind_str(), "pending action overwritten");
        }
    }

    /// Consume the slot. The action is removed *before* any replay runs, so
    /// a failed replay can never leave a stale action that re-fires later.
    pub fn take(&mut self) -> Option<PendingAction> {
        self.0.take()
    }

    pub fn get(&self) -> Option<&PendingAction> {
        self.0.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Load a slot persisted by a one-shot frontend; missing file = empty.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let slot: PendingSlot = serde_yaml::from_str(&data)?;
        Ok(slot)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(path, data.as_bytes())?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_is_last_writer_wins() {
        let mut slot = PendingSlot::default();
        slot.enqueue(PendingAction::ApplyHook { force_kill: false });
        slot.enqueue(PendingAction::RestoreHook { force_kill: true });

        assert_eq!(
            slot.take(),
            Some(PendingAction::RestoreHook { force_kill: true })
        );
        assert!(slot.is_empty());
    }

    #[test]
    fn take_consumes_exactly_once() {
        let mut slot = PendingSlot::default();
        slot.enqueue(PendingAction::ApplyHook { force_kill: true });

        assert!(slot.take().is_some());
        assert!(slot.take().is_none());
    }

    #[test]
    fn save_load_roundtrips_full_and_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pending.yaml");

        let mut slot = PendingSlot::default();
        slot.enqueue(PendingAction::RestoreHook { force_kill: false });
        slot.save(&path).unwrap();
        assert_eq!(PendingSlot::load(&path).unwrap().get(), slot.get());

        slot.take();
        slot.save(&path).unwrap();
        assert!(PendingSlot::load(&path).unwrap().is_empty());
    }

    #[test]
    fn load_of_missing_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(PendingSlot::load(&dir.path().join("pending.yaml"))
            .unwrap()
            .is_empty());
    }
}
