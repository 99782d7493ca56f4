//! Hook orchestrator: drives the target application from "patch not
//! applied" to "patch applied" (or the reverse) despite the process
//! possibly being alive and its install location possibly unknown.
//!
//! Every invocation runs `Idle → Checking → {NeedsConfirmation | Injecting}
//! → {Success | NeedsManualPath | PermissionRequired | Fatal}`. All
//! branching keys on [`BackendError`] variants; no failure reaches the
//! caller unclassified — anything unexpected is wrapped as `Fatal`.

use std::time::Duration;

use crate::backend::TargetBackend;
use crate::error::BackendError;
use crate::history::{HistoryKind, HistoryRecord};
use crate::pending::PendingAction;
use crate::store::Store;
use crate::types::{HookStatus, Outcome};

// ---------------------------------------------------------------------------
// apply_hook
// ---------------------------------------------------------------------------

/// Apply the runtime patch.
///
/// With `force_kill = false` this never terminates a live process: a
/// running target yields `NeedsConfirmation` and the caller re-invokes
/// with `force_kill = true` after user consent.
pub async fn apply_hook<B: TargetBackend>(
    backend: &B,
    store: &mut Store,
    force_kill: bool,
    settle: Duration,
    operator: &str,
) -> Outcome {
    let running = match backend.query_running().await {
        Ok(r) => r,
        Err(e) => return Outcome::fatal(e.to_string()),
    };

    if running && !force_kill {
        return Outcome::NeedsConfirmation;
    }

    // Where the platform allows patching under a live process, try that
    // first: no restart needed. Failure falls through to the normal chain
    // instead of aborting.
    if running && force_kill && backend.supports_live_patch() {
        match inject(backend, true).await {
            Ok(()) => return finish(backend, store, HistoryKind::HookApply, operator).await,
            Err(e) => tracing::debug!(error = %e, "live patch failed, falling back"),
        }
    }

    match inject(backend, force_kill).await {
        Ok(()) => finish(backend, store, HistoryKind::HookApply, operator).await,
        Err(BackendError::EntryNotFound) => {
            store.pending.enqueue(PendingAction::ApplyHook { force_kill });
            Outcome::NeedsManualPath
        }
        // Race defense: the process may have started between the running
        // check above and the patch attempt.
        Err(BackendError::ProcessBusy) if !force_kill => Outcome::NeedsConfirmation,
        Err(BackendError::ProcessBusy) => {
            kill_and_retry(backend, store, settle, operator, HookOp::Apply).await
        }
        Err(e) => Outcome::fatal(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// restore_hook
// ---------------------------------------------------------------------------

/// Remove the runtime patch. Same shape as [`apply_hook`] minus the
/// live-process attempt.
pub async fn restore_hook<B: TargetBackend>(
    backend: &B,
    store: &mut Store,
    force_kill: bool,
    settle: Duration,
    operator: &str,
) -> Outcome {
    let running = match backend.query_running().await {
        Ok(r) => r,
        Err(e) => return Outcome::fatal(e.to_string()),
    };

    if running && !force_kill {
        return Outcome::NeedsConfirmation;
    }

    match backend.restore_patch(force_kill).await {
        Ok(()) => finish(backend, store, HistoryKind::HookRestore, operator).await,
        Err(BackendError::EntryNotFound) => {
            store.pending.enqueue(PendingAction::RestoreHook { force_kill });
            Outcome::NeedsManualPath
        }
        Err(BackendError::ProcessBusy) if !force_kill => Outcome::NeedsConfirmation,
        Err(BackendError::ProcessBusy) => {
            kill_and_retry(backend, store, settle, operator, HookOp::Restore).await
        }
        Err(e) => Outcome::fatal(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// refresh_hook_status
// ---------------------------------------------------------------------------

/// Re-check patch presence. The status is `Unknown` only while the check is
/// in flight; it settles on every path.
pub async fn refresh_hook_status<B: TargetBackend>(backend: &B, store: &mut Store) {
    let prev = store.hook_status;
    store.hook_status = HookStatus::Unknown;

    store.hook_status = match backend.query_patch_status().await {
        Ok(flag) => HookStatus::from_flag(flag),
        Err(e) => {
            tracing::warn!(error = %e, "patch status check failed");
            if prev == HookStatus::Unknown {
                HookStatus::NotApplied
            } else {
                prev
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum HookOp {
    Apply,
    Restore,
}

impl HookOp {
    fn kind(self) -> HistoryKind {
        match self {
            HookOp::Apply => HistoryKind::HookApply,
            HookOp::Restore => HistoryKind::HookRestore,
        }
    }
}

/// Discovery + injection as one step: `EntryNotFound` from either call is
/// the signal to defer to the user.
async fn inject<B: TargetBackend>(backend: &B, force: bool) -> Result<(), BackendError> {
    backend.locate_entry_script().await?;
    backend.apply_patch(force).await
}

/// Forced-termination branch: terminate, wait the settle interval, retry the
/// operation exactly once.
async fn kill_and_retry<B: TargetBackend>(
    backend: &B,
    store: &mut Store,
    settle: Duration,
    operator: &str,
    op: HookOp,
) -> Outcome {
    match backend.terminate(true).await {
        Ok(()) => {}
        Err(BackendError::PermissionDenied) => return Outcome::PermissionRequired,
        Err(e) => return Outcome::fatal(e.to_string()),
    }

    tokio::time::sleep(settle).await;

    let retried = match op {
        HookOp::Apply => inject(backend, true).await,
        HookOp::Restore => backend.restore_patch(true).await,
    };
    match retried {
        Ok(()) => finish(backend, store, op.kind(), operator).await,
        Err(e) => Outcome::fatal(e.to_string()),
    }
}

/// Success epilogue: verify patch presence against the script itself (a
/// patch that silently no-ops must not be reported as applied), then append
/// the history record. History failures are logged, not fatal.
async fn finish<B: TargetBackend>(
    backend: &B,
    store: &mut Store,
    kind: HistoryKind,
    operator: &str,
) -> Outcome {
    let expected = match kind {
        HistoryKind::HookApply => HookStatus::Applied,
        _ => HookStatus::NotApplied,
    };

    store.hook_status = match backend.query_patch_status().await {
        Ok(flag) => {
            let status = HookStatus::from_flag(flag);
            if status != expected {
                tracing::warn!(expected = %expected, actual = %status, "patch verification mismatch");
            }
            status
        }
        Err(e) => {
            tracing::warn!(error = %e, "patch verification failed");
            expected
        }
    };

    let detail = match kind {
        HistoryKind::HookApply => "runtime patch applied to entry script",
        _ => "runtime patch removed from entry script",
    };
    let record = HistoryRecord::new(kind, detail, operator);
    if let Err(e) = backend.append_history(&record).await {
        tracing::warn!(error = %e, "failed to append history record");
    }

    Outcome::Success
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
