//! Scripted in-memory backend for orchestrator and session tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::backend::{BackendResult, TargetBackend};
use crate::error::BackendError;
use crate::history::HistoryRecord;
use crate::identity::IdentityState;
use crate::usage::ModelUsage;

/// Builder-style mock: defaults model a quiet, healthy target (not running,
/// entry script discoverable, every operation succeeding). Tests script the
/// failure sequences they need; scripted errors are popped one per call,
/// after which the operation succeeds again.
pub(crate) struct MockBackend {
    pub(crate) running: bool,
    pub(crate) live_patch: bool,
    pub(crate) entry: Option<PathBuf>,
    pub(crate) apply_errors: Mutex<VecDeque<BackendError>>,
    pub(crate) restore_errors: Mutex<VecDeque<BackendError>>,
    pub(crate) terminate_error: Mutex<Option<BackendError>>,
    pub(crate) switch_errors: Mutex<VecDeque<BackendError>>,
    /// Per-call results for `mutate_identity`: `Ok(())` lets the call run,
    /// `Err` fails it. Empty queue = success.
    pub(crate) mutate_results: Mutex<VecDeque<BackendResult<()>>>,
    pub(crate) usage_result: Mutex<Option<BackendResult<BTreeMap<String, ModelUsage>>>>,
    pub(crate) patched: Mutex<bool>,
    pub(crate) verify_override: Option<bool>,
    pub(crate) status_error: bool,
    pub(crate) identity: Mutex<IdentityState>,
    pub(crate) history: Mutex<Vec<HistoryRecord>>,
    pub(crate) terminated: Mutex<bool>,
    pub(crate) valid_entry: bool,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            running: false,
            live_patch: false,
            entry: Some(PathBuf::from("/tmp/target/main.js")),
            apply_errors: Mutex::new(VecDeque::new()),
            restore_errors: Mutex::new(VecDeque::new()),
            terminate_error: Mutex::new(None),
            switch_errors: Mutex::new(VecDeque::new()),
            mutate_results: Mutex::new(VecDeque::new()),
            usage_result: Mutex::new(None),
            patched: Mutex::new(false),
            verify_override: None,
            status_error: false,
            identity: Mutex::new(IdentityState {
                machine_code: "aa11".repeat(16),
                current_account: "old@example.com".into(),
                auth_token: "old-token".into(),
            }),
            history: Mutex::new(Vec::new()),
            terminated: Mutex::new(false),
            valid_entry: true,
        }
    }

    pub(crate) fn running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }

    pub(crate) fn live_patch(mut self, supported: bool) -> Self {
        self.live_patch = supported;
        self
    }

    pub(crate) fn without_entry(mut self) -> Self {
        self.entry = None;
        self
    }

    pub(crate) fn rejecting_entry(mut self) -> Self {
        self.valid_entry = false;
        self
    }

    pub(crate) fn patched(self, patched: bool) -> Self {
        *self.patched.lock().unwrap() = patched;
        self
    }

    pub(crate) fn verify_as(mut self, flag: bool) -> Self {
        self.verify_override = Some(flag);
        self
    }

    pub(crate) fn status_error(mut self) -> Self {
        self.status_error = true;
        self
    }

    pub(crate) fn apply_errors(self, errors: Vec<BackendError>) -> Self {
        *self.apply_errors.lock().unwrap() = errors.into();
        self
    }

    pub(crate) fn restore_errors(self, errors: Vec<BackendError>) -> Self {
        *self.restore_errors.lock().unwrap() = errors.into();
        self
    }

    pub(crate) fn terminate_error(self, error: BackendError) -> Self {
        *self.terminate_error.lock().unwrap() = Some(error);
        self
    }

    pub(crate) fn switch_errors(self, errors: Vec<BackendError>) -> Self {
        *self.switch_errors.lock().unwrap() = errors.into();
        self
    }

    pub(crate) fn mutate_results(self, results: Vec<BackendResult<()>>) -> Self {
        *self.mutate_results.lock().unwrap() = results.into();
        self
    }

    pub(crate) fn usage(self, result: BackendResult<BTreeMap<String, ModelUsage>>) -> Self {
        *self.usage_result.lock().unwrap() = Some(result);
        self
    }

    pub(crate) fn history(&self) -> Vec<HistoryRecord> {
        self.history.lock().unwrap().clone()
    }

    pub(crate) fn was_terminated(&self) -> bool {
        *self.terminated.lock().unwrap()
    }

    pub(crate) fn identity_snapshot(&self) -> IdentityState {
        self.identity.lock().unwrap().clone()
    }
}

#[async_trait]
impl TargetBackend for MockBackend {
    async fn query_running(&self) -> BackendResult<bool> {
        Ok(self.running)
    }

    async fn terminate(&self, _force: bool) -> BackendResult<()> {
        if let Some(e) = self.terminate_error.lock().unwrap().take() {
            return Err(e);
        }
        *self.terminated.lock().unwrap() = true;
        Ok(())
    }

    async fn launch(&self) -> BackendResult<()> {
        Ok(())
    }

    async fn locate_entry_script(&self) -> BackendResult<PathBuf> {
        self.entry.clone().ok_or(BackendError::EntryNotFound)
    }

    async fn set_entry_location(&mut self, path: &Path) -> BackendResult<PathBuf> {
        if !self.valid_entry {
            return Err(BackendError::InvalidPath(path.display().to_string()));
        }
        self.entry = Some(path.to_path_buf());
        Ok(path.to_path_buf())
    }

    async fn apply_patch(&self, _force: bool) -> BackendResult<()> {
        if let Some(e) = self.apply_errors.lock().unwrap().pop_front() {
            return Err(e);
        }
        *self.patched.lock().unwrap() = true;
        Ok(())
    }

    async fn restore_patch(&self, _force: bool) -> BackendResult<()> {
        if let Some(e) = self.restore_errors.lock().unwrap().pop_front() {
            return Err(e);
        }
        *self.patched.lock().unwrap() = false;
        Ok(())
    }

    async fn query_patch_status(&self) -> BackendResult<bool> {
        if self.status_error {
            return Err(BackendError::Other("status probe failed".into()));
        }
        if let Some(flag) = self.verify_override {
            return Ok(flag);
        }
        Ok(*self.patched.lock().unwrap())
    }

    async fn read_identity(&self) -> BackendResult<IdentityState> {
        Ok(self.identity.lock().unwrap().clone())
    }

    async fn mutate_identity(&self, new: Option<&IdentityState>) -> BackendResult<IdentityState> {
        if let Some(result) = self.mutate_results.lock().unwrap().pop_front() {
            result?;
        }
        let mut id = self.identity.lock().unwrap();
        match new {
            Some(wanted) => *id = wanted.clone(),
            None => id.machine_code = "f0e1".repeat(16),
        }
        Ok(id.clone())
    }

    async fn switch_account(&self, email: &str, token: &str, _force: bool) -> BackendResult<()> {
        if let Some(e) = self.switch_errors.lock().unwrap().pop_front() {
            return Err(e);
        }
        let mut id = self.identity.lock().unwrap();
        id.current_account = email.to_string();
        id.auth_token = token.to_string();
        Ok(())
    }

    async fn fetch_usage(&self, _token: &str) -> BackendResult<BTreeMap<String, ModelUsage>> {
        match self.usage_result.lock().unwrap().take() {
            Some(result) => result,
            None => Ok(BTreeMap::new()),
        }
    }

    async fn append_history(&self, record: &HistoryRecord) -> BackendResult<()> {
        self.history.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn supports_live_patch(&self) -> bool {
        self.live_patch
    }
}
