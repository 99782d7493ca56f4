//! Process-scoped session: the reactive store plus the backend it is fed
//! from, constructed once at startup and handed to the presentation layer.
//!
//! Every mutating operation is guarded by its busy flag — a re-entrant
//! invocation from the same UI trigger returns `None` and does nothing —
//! and the flag is cleared on every return path, success or failure.

use chrono::Utc;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use crate::backend::TargetBackend;
use crate::config::TargetConfig;
use crate::error::{CoreError, Result};
use crate::history::{HistoryKind, HistoryRecord};
use crate::identity::IdentityState;
use crate::orchestrator;
use crate::pending::{PendingAction, PendingSlot};
use crate::store::Store;
use crate::types::Outcome;
use crate::usage::UsageSnapshot;

// ---------------------------------------------------------------------------
// Email validation
// ---------------------------------------------------------------------------

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() || email.len() > 254 || !email_re().is_match(email) {
        return Err(CoreError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Session<B: TargetBackend> {
    store: Store,
    backend: B,
    settle: Duration,
    operator: String,
}

impl<B: TargetBackend> Session<B> {
    pub fn new(backend: B, config: &TargetConfig) -> Self {
        Self {
            store: Store::new(),
            backend,
            settle: config.settle(),
            operator: config.operator(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Restore a previously saved pending slot. One-shot frontends (the
    /// CLI) persist the slot between invocations; long-lived ones don't
    /// need this.
    pub fn hydrate_pending(&mut self, slot: PendingSlot) {
        self.store.pending = slot;
    }

    // -- Hook operations ----------------------------------------------------

    pub async fn apply_hook(&mut self, force_kill: bool) -> Option<Outcome> {
        if self.store.busy.hook {
            return None;
        }
        self.store.busy.hook = true;
        let out = orchestrator::apply_hook(
            &self.backend,
            &mut self.store,
            force_kill,
            self.settle,
            &self.operator,
        )
        .await;
        self.store.busy.hook = false;
        Some(out)
    }

    pub async fn restore_hook(&mut self, force_kill: bool) -> Option<Outcome> {
        if self.store.busy.hook {
            return None;
        }
        self.store.busy.hook = true;
        let out = orchestrator::restore_hook(
            &self.backend,
            &mut self.store,
            force_kill,
            self.settle,
            &self.operator,
        )
        .await;
        self.store.busy.hook = false;
        Some(out)
    }

    pub async fn refresh_hook_status(&mut self) {
        orchestrator::refresh_hook_status(&self.backend, &mut self.store).await;
    }

    /// Accept a user-supplied entry script location and replay the queued
    /// action, if any.
    ///
    /// Validation failure leaves the slot intact so the user can retry with
    /// another path. Once validation passes, the slot is emptied *before*
    /// the replay runs — a failed replay never leaves a stale action that
    /// silently re-fires later.
    pub async fn resolve_entry_location(&mut self, path: &Path) -> Option<Result<Outcome>> {
        if self.store.busy.entry_select {
            return None;
        }
        self.store.busy.entry_select = true;
        let result = self.resolve_inner(path).await;
        self.store.busy.entry_select = false;
        Some(result)
    }

    async fn resolve_inner(&mut self, path: &Path) -> Result<Outcome> {
        self.backend.set_entry_location(path).await?;

        let Some(action) = self.store.pending.take() else {
            // Nothing deferred; accepting the path is the whole operation.
            return Ok(Outcome::Success);
        };

        let out = match action {
            PendingAction::ApplyHook { force_kill } => {
                orchestrator::apply_hook(
                    &self.backend,
                    &mut self.store,
                    force_kill,
                    self.settle,
                    &self.operator,
                )
                .await
            }
            PendingAction::RestoreHook { force_kill } => {
                orchestrator::restore_hook(
                    &self.backend,
                    &mut self.store,
                    force_kill,
                    self.settle,
                    &self.operator,
                )
                .await
            }
        };
        Ok(out)
    }

    // -- Identity / account operations --------------------------------------

    pub async fn refresh_identity(&mut self) -> Result<()> {
        self.store.identity = self.backend.read_identity().await?;
        Ok(())
    }

    pub async fn reset_identity(&mut self) -> Option<Result<IdentityState>> {
        if self.store.busy.identity_reset {
            return None;
        }
        self.store.busy.identity_reset = true;
        let result = self.reset_inner().await;
        self.store.busy.identity_reset = false;
        Some(result)
    }

    async fn reset_inner(&mut self) -> Result<IdentityState> {
        let fresh = self.backend.mutate_identity(None).await?;
        self.store.identity = fresh.clone();
        self.record(
            HistoryKind::MachineReset,
            format!("machine code reset to {}…", fresh.machine_code_short()),
        )
        .await;
        Ok(fresh)
    }

    pub async fn switch_account(
        &mut self,
        email: &str,
        token: &str,
        force: bool,
    ) -> Option<Result<()>> {
        if self.store.busy.account_switch {
            return None;
        }
        self.store.busy.account_switch = true;
        let result = self.switch_inner(email, token, force).await;
        self.store.busy.account_switch = false;
        Some(result)
    }

    async fn switch_inner(&mut self, email: &str, token: &str, force: bool) -> Result<()> {
        validate_email(email)?;
        self.backend.switch_account(email, token, force).await?;
        self.store.identity = self.backend.read_identity().await?;
        self.record(HistoryKind::AccountSwitch, format!("switched to {email}"))
            .await;
        Ok(())
    }

    /// Reset the machine identity, then switch the account. Either both end
    /// in their new state or both in their original state: a failed switch
    /// triggers a compensating restore of the pre-reset identity. A restore
    /// that itself fails is logged and surfaced as `CompensationFailed`,
    /// never swallowed.
    pub async fn quick_change(
        &mut self,
        email: Option<&str>,
        token: Option<&str>,
        force: bool,
    ) -> Option<Result<IdentityState>> {
        if self.store.busy.quick_change {
            return None;
        }
        self.store.busy.quick_change = true;
        let result = self.quick_change_inner(email, token, force).await;
        self.store.busy.quick_change = false;
        Some(result)
    }

    async fn quick_change_inner(
        &mut self,
        email: Option<&str>,
        token: Option<&str>,
        force: bool,
    ) -> Result<IdentityState> {
        if let Some(email) = email {
            validate_email(email)?;
        }

        let pre = self.backend.read_identity().await?;
        self.backend.mutate_identity(None).await?;

        if let (Some(email), Some(token)) = (email, token) {
            if let Err(switch_err) = self.backend.switch_account(email, token, force).await {
                match self.backend.mutate_identity(Some(&pre)).await {
                    Ok(restored) => {
                        self.store.identity = restored;
                        return Err(switch_err.into());
                    }
                    Err(restore_err) => {
                        tracing::error!(
                            switch = %switch_err,
                            restore = %restore_err,
                            "identity restore after failed account switch also failed"
                        );
                        return Err(CoreError::CompensationFailed {
                            switch: switch_err.to_string(),
                            restore: restore_err.to_string(),
                        });
                    }
                }
            }
        }

        let current = self.backend.read_identity().await?;
        self.store.identity = current.clone();
        let detail = match (email, token) {
            (Some(email), Some(_)) => format!("machine code reset, switched to {email}"),
            _ => "machine code reset, account unchanged".to_string(),
        };
        self.record(HistoryKind::QuickChange, detail).await;
        Ok(current)
    }

    // -- Usage ---------------------------------------------------------------

    /// Refresh per-model usage for the stored token. A failed fetch keeps
    /// the previous snapshot data and records only the failure kind.
    pub async fn refresh_usage(&mut self) -> Option<UsageSnapshot> {
        if self.store.busy.usage {
            return None;
        }
        self.store.busy.usage = true;
        let token = self.store.identity.auth_token.clone();
        match self.backend.fetch_usage(&token).await {
            Ok(per_model) => self.store.usage.record_success(per_model, Utc::now()),
            Err(e) => {
                tracing::warn!(kind = e.kind(), error = %e, "usage refresh failed");
                self.store.usage.record_failure(e.kind());
            }
        }
        self.store.busy.usage = false;
        Some(self.store.usage.clone())
    }

    // -- Misc ----------------------------------------------------------------

    pub async fn launch(&self) -> Result<()> {
        self.backend.launch().await.map_err(Into::into)
    }

    async fn record(&self, kind: HistoryKind, detail: String) {
        let record = HistoryRecord::new(kind, detail, self.operator.as_str());
        if let Err(e) = self.backend.append_history(&record).await {
            tracing::warn!(error = %e, "failed to append history record");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::testutil::MockBackend;
    use crate::types::HookStatus;
    use crate::usage::ModelUsage;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn session(backend: MockBackend) -> Session<MockBackend> {
        let config = TargetConfig {
            settle_ms: 1,
            operator: Some("tester".into()),
            ..Default::default()
        };
        Session::new(backend, &config)
    }

    #[tokio::test]
    async fn busy_flag_makes_reentry_a_noop() {
        let mut s = session(MockBackend::new());
        s.store.busy.hook = true;
        assert!(s.apply_hook(false).await.is_none());
        assert!(s.restore_hook(true).await.is_none());

        s.store.busy.hook = false;
        assert!(s.apply_hook(false).await.is_some());
    }

    #[tokio::test]
    async fn busy_flag_released_after_failure() {
        let backend = MockBackend::new().apply_errors(vec![BackendError::Other("boom".into())]);
        let mut s = session(backend);

        let out = s.apply_hook(false).await.unwrap();
        assert!(matches!(out, Outcome::Fatal { .. }));
        assert!(!s.store().busy.hook);
    }

    #[tokio::test]
    async fn resolve_replays_queued_apply_and_clears_slot() {
        let backend = MockBackend::new().without_entry();
        let mut s = session(backend);

        let out = s.apply_hook(true).await.unwrap();
        assert_eq!(out, Outcome::NeedsManualPath);
        assert!(!s.store().pending.is_empty());

        let out = s
            .resolve_entry_location(&PathBuf::from("/tmp/manual/main.js"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out, Outcome::Success);
        assert!(s.store().pending.is_empty());
        assert_eq!(s.store().hook_status, HookStatus::Applied);
    }

    #[tokio::test]
    async fn resolve_clears_slot_even_when_replay_fails() {
        let backend = MockBackend::new().without_entry();
        let mut s = session(backend);

        s.apply_hook(true).await.unwrap();
        // The replayed apply will blow up, but the slot must still be empty.
        *s.backend.apply_errors.lock().unwrap() =
            vec![BackendError::Other("replay boom".into())].into();

        let out = s
            .resolve_entry_location(&PathBuf::from("/tmp/x/main.js"))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(out, Outcome::Fatal { .. }));
        assert!(s.store().pending.is_empty());
    }

    #[tokio::test]
    async fn resolve_keeps_slot_on_validation_failure() {
        let backend = MockBackend::new().without_entry().rejecting_entry();
        let mut s = session(backend);

        s.apply_hook(true).await.unwrap();
        let result = s
            .resolve_entry_location(&PathBuf::from("/nope"))
            .await
            .unwrap();
        assert!(result.is_err());
        assert!(!s.store().pending.is_empty());
    }

    #[tokio::test]
    async fn switch_refreshes_identity_wholesale() {
        let mut s = session(MockBackend::new());

        s.switch_account("new@example.com", "new-token", false)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(s.store().identity.current_account, "new@example.com");
        assert_eq!(s.store().identity.auth_token, "new-token");
    }

    #[tokio::test]
    async fn switch_rejects_bad_email() {
        let mut s = session(MockBackend::new());
        let result = s.switch_account("not-an-email", "tok", false).await.unwrap();
        assert!(matches!(result, Err(CoreError::InvalidEmail(_))));
        assert!(!s.store().busy.account_switch);
    }

    #[tokio::test]
    async fn quick_change_compensates_on_switch_failure() {
        let backend =
            MockBackend::new().switch_errors(vec![BackendError::Other("switch rejected".into())]);
        let pre = backend.identity_snapshot();
        let mut s = session(backend);

        let result = s
            .quick_change(Some("new@example.com"), Some("tok"), false)
            .await
            .unwrap();

        assert!(result.is_err());
        // Compensating restore: backend identity equals its pre-call value.
        assert_eq!(s.backend.identity_snapshot(), pre);
        assert!(!s.store().busy.quick_change);
    }

    #[tokio::test]
    async fn quick_change_surfaces_double_failure() {
        // Reset succeeds, switch fails, compensating restore fails too.
        let backend = MockBackend::new()
            .switch_errors(vec![BackendError::Other("switch rejected".into())])
            .mutate_results(vec![Ok(()), Err(BackendError::Other("disk gone".into()))]);
        let mut s = session(backend);

        let result = s
            .quick_change(Some("new@example.com"), Some("tok"), false)
            .await
            .unwrap();

        assert!(matches!(
            result,
            Err(CoreError::CompensationFailed { .. })
        ));
        assert!(!s.store().busy.quick_change);
    }

    #[tokio::test]
    async fn usage_failure_keeps_previous_data() {
        let mut map = BTreeMap::new();
        map.insert(
            "gpt-4".to_string(),
            ModelUsage {
                used: 10,
                cap: Some(500),
            },
        );
        let mut s = session(MockBackend::new().usage(Ok(map)));

        let snap = s.refresh_usage().await.unwrap();
        assert_eq!(snap.per_model.len(), 1);
        assert!(snap.error_kind.is_none());

        // Next fetch fails: data survives, only error_kind flips.
        *s.backend.usage_result.lock().unwrap() =
            Some(Err(BackendError::Other("api down".into())));
        let snap = s.refresh_usage().await.unwrap();
        assert_eq!(snap.per_model.len(), 1);
        assert_eq!(snap.error_kind.as_deref(), Some("other"));
        assert!(!s.store().busy.usage);
    }

    #[tokio::test]
    async fn reset_records_history() {
        let mut s = session(MockBackend::new());
        let fresh = s.reset_identity().await.unwrap().unwrap();

        assert_eq!(s.store().identity, fresh);
        let history = s.backend.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, HistoryKind::MachineReset);
        assert_eq!(history[0].operator, "tester");
    }
}
