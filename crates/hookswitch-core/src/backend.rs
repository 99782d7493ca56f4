use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::BackendError;
use crate::history::HistoryRecord;
use crate::identity::IdentityState;
use crate::usage::ModelUsage;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

// ---------------------------------------------------------------------------
// TargetBackend
// ---------------------------------------------------------------------------

/// Facade over the target application: process control, entry-script
/// discovery, patch injection, identity/account mutation, usage, history.
///
/// Implementations classify every failure into a [`BackendError`] variant;
/// the orchestrator's branching depends on that, not on error text. All
/// operations are awaited sequentially by the caller — implementations may
/// assume no two calls overlap.
#[async_trait]
pub trait TargetBackend: Send + Sync {
    /// Is any of the target's processes alive?
    async fn query_running(&self) -> BackendResult<bool>;

    /// Terminate the target. Fails `ProcessBusy` when still alive after the
    /// implementation's own retry budget, `PermissionDenied` when blocked
    /// by OS policy.
    async fn terminate(&self, force: bool) -> BackendResult<()>;

    /// Start the target application.
    async fn launch(&self) -> BackendResult<()>;

    /// Resolve the target's entry script automatically. `EntryNotFound`
    /// when no candidate exists.
    async fn locate_entry_script(&self) -> BackendResult<PathBuf>;

    /// Validate and remember a user-supplied entry script location.
    /// `InvalidPath` when the path does not point at a usable entry script.
    async fn set_entry_location(&mut self, path: &Path) -> BackendResult<PathBuf>;

    /// Inject the runtime patch into the entry script.
    async fn apply_patch(&self, force: bool) -> BackendResult<()>;

    /// Remove the runtime patch from the entry script.
    async fn restore_patch(&self, force: bool) -> BackendResult<()>;

    /// Is the patch currently present in the entry script?
    async fn query_patch_status(&self) -> BackendResult<bool>;

    /// Read the current identity without mutating anything.
    async fn read_identity(&self) -> BackendResult<IdentityState>;

    /// Rewrite the machine identity. `None` generates a fresh one; `Some`
    /// restores the given state. Returns the resulting identity.
    async fn mutate_identity(&self, new: Option<&IdentityState>) -> BackendResult<IdentityState>;

    /// Swap the signed-in account in the target's state database.
    async fn switch_account(&self, email: &str, token: &str, force: bool) -> BackendResult<()>;

    /// Fetch per-model usage for the given access token.
    async fn fetch_usage(&self, token: &str) -> BackendResult<BTreeMap<String, ModelUsage>>;

    /// Persist one history record (append-only; never read back here).
    async fn append_history(&self, record: &HistoryRecord) -> BackendResult<()>;

    /// Whether this platform can patch the entry script while the target is
    /// running (the patch takes effect on the next start). False where the
    /// running process locks the script file.
    fn supports_live_patch(&self) -> bool;
}
