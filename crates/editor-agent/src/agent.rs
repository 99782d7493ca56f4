//! [`EditorAgent`] — the concrete [`TargetBackend`] driving a real install
//! of the target application.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hookswitch_core::{
    BackendError, BackendResult, HistoryRecord, IdentityState, ModelUsage, TargetBackend,
    TargetConfig,
};

use crate::{account, history, identity, patch, paths, process};

pub struct EditorAgent {
    config: TargetConfig,
    /// User-supplied entry script, accepted via `set_entry_location`. Takes
    /// precedence over discovery for the rest of the session.
    entry_override: Option<PathBuf>,
    http: reqwest::Client,
}

impl EditorAgent {
    pub fn new(config: TargetConfig) -> Self {
        Self {
            config,
            entry_override: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    fn resolve_entry(&self) -> BackendResult<PathBuf> {
        if let Some(path) = &self.entry_override {
            if path.is_file() {
                return Ok(path.clone());
            }
        }
        paths::entry_script_candidates(&self.config)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or(BackendError::EntryNotFound)
    }

    /// Patching rewrites the entry script; a live target either forbids it
    /// outright (no consent) or on Windows keeps the file locked even under
    /// force, so the caller has to go through terminate-and-retry.
    async fn ensure_patch_allowed(&self, force: bool) -> BackendResult<()> {
        let running = process::query_running(&self.config.process_names).await?;
        if running && (!force || cfg!(target_os = "windows")) {
            return Err(BackendError::ProcessBusy);
        }
        Ok(())
    }
}

#[async_trait]
impl TargetBackend for EditorAgent {
    async fn query_running(&self) -> BackendResult<bool> {
        process::query_running(&self.config.process_names).await
    }

    async fn terminate(&self, force: bool) -> BackendResult<()> {
        tracing::info!(app = %self.config.app_name, force, "terminating target application");
        process::terminate(&self.config.process_names, force).await
    }

    async fn launch(&self) -> BackendResult<()> {
        process::launch(&self.config)
    }

    async fn locate_entry_script(&self) -> BackendResult<PathBuf> {
        self.resolve_entry()
    }

    async fn set_entry_location(&mut self, path: &Path) -> BackendResult<PathBuf> {
        if !path.is_file() {
            return Err(BackendError::InvalidPath(format!(
                "{} is not a file",
                path.display()
            )));
        }
        if path.extension().and_then(|e| e.to_str()) != Some("js") {
            return Err(BackendError::InvalidPath(format!(
                "{} is not a JavaScript entry script",
                path.display()
            )));
        }
        let resolved = std::fs::canonicalize(path).map_err(BackendError::Io)?;
        tracing::info!(entry = %resolved.display(), "entry script set manually");
        self.entry_override = Some(resolved.clone());
        Ok(resolved)
    }

    async fn apply_patch(&self, force: bool) -> BackendResult<()> {
        self.ensure_patch_allowed(force).await?;
        let entry = self.resolve_entry()?;
        let storage = paths::storage_file(&self.config)?;
        let ids = identity::read_ids_or_generate(&storage)?;
        let block = patch::build_block(&ids);
        patch::apply(&entry, &block)?;
        tracing::info!(entry = %entry.display(), "hook applied");
        Ok(())
    }

    async fn restore_patch(&self, force: bool) -> BackendResult<()> {
        self.ensure_patch_allowed(force).await?;
        let entry = self.resolve_entry()?;
        patch::restore(&entry)?;
        tracing::info!(entry = %entry.display(), "hook removed");
        Ok(())
    }

    async fn query_patch_status(&self) -> BackendResult<bool> {
        match self.resolve_entry() {
            Ok(entry) => patch::status(&entry),
            Err(BackendError::EntryNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn read_identity(&self) -> BackendResult<IdentityState> {
        let storage = paths::storage_file(&self.config)?;
        let machine_code = identity::read_machine_id(&storage)?.unwrap_or_default();
        let (current_account, auth_token) = account::read_account(&paths::state_db(&self.config)?)?;
        Ok(IdentityState {
            machine_code,
            current_account,
            auth_token,
        })
    }

    async fn mutate_identity(&self, new: Option<&IdentityState>) -> BackendResult<IdentityState> {
        let storage = paths::storage_file(&self.config)?;
        match new {
            None => {
                let ids = identity::generate();
                identity::write_ids(&storage, &ids)?;
                tracing::info!(machine_id = %&ids.machine_id[..12], "machine identity regenerated");
            }
            Some(wanted) => {
                identity::write_machine_id(&storage, &wanted.machine_code)?;
                tracing::info!("machine identity restored");
            }
        }
        self.read_identity().await
    }

    async fn switch_account(&self, email: &str, token: &str, force: bool) -> BackendResult<()> {
        let running = process::query_running(&self.config.process_names).await?;
        if running {
            if !force {
                return Err(BackendError::ProcessBusy);
            }
            process::terminate(&self.config.process_names, true).await?;
        }
        account::write_account(&paths::state_db(&self.config)?, email, token)?;
        tracing::info!(email = %email, "account switched");
        Ok(())
    }

    async fn fetch_usage(&self, token: &str) -> BackendResult<BTreeMap<String, ModelUsage>> {
        crate::usage::fetch(&self.http, &self.config.usage_api_base, token).await
    }

    async fn append_history(&self, record: &HistoryRecord) -> BackendResult<()> {
        history::append(&paths::history_file()?, record)
    }

    fn supports_live_patch(&self) -> bool {
        // Windows keeps the entry script locked while the target runs.
        cfg!(not(target_os = "windows"))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Config pointing every path at a temp tree and the process check at a
    /// name that cannot be running.
    fn test_agent(dir: &TempDir) -> EditorAgent {
        let entry = dir.path().join("main.js");
        std::fs::write(&entry, "require(\"./app\");\n").unwrap();
        EditorAgent::new(TargetConfig {
            app_name: "FakeEditor".into(),
            process_names: vec!["hookswitch-agent-test-proc".into()],
            data_dir: Some(dir.path().join("data")),
            entry_script: Some(entry),
            settle_ms: 1,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn apply_then_status_then_restore() {
        let dir = TempDir::new().unwrap();
        let agent = test_agent(&dir);

        assert!(!agent.query_patch_status().await.unwrap());
        agent.apply_patch(false).await.unwrap();
        assert!(agent.query_patch_status().await.unwrap());
        agent.restore_patch(false).await.unwrap();
        assert!(!agent.query_patch_status().await.unwrap());
    }

    #[tokio::test]
    async fn missing_entry_reports_entry_not_found() {
        let dir = TempDir::new().unwrap();
        let mut agent = test_agent(&dir);
        agent.config.entry_script = Some(dir.path().join("nowhere/main.js"));

        let err = agent.apply_patch(false).await.unwrap_err();
        assert!(matches!(err, BackendError::EntryNotFound));
        // Status is a question, not a failure, when nothing is installed.
        assert!(!agent.query_patch_status().await.unwrap());
    }

    #[tokio::test]
    async fn set_entry_location_validates() {
        let dir = TempDir::new().unwrap();
        let mut agent = test_agent(&dir);

        let missing = dir.path().join("absent.js");
        assert!(matches!(
            agent.set_entry_location(&missing).await.unwrap_err(),
            BackendError::InvalidPath(_)
        ));

        let wrong_kind = dir.path().join("notes.txt");
        std::fs::write(&wrong_kind, "hi").unwrap();
        assert!(matches!(
            agent.set_entry_location(&wrong_kind).await.unwrap_err(),
            BackendError::InvalidPath(_)
        ));

        let good = dir.path().join("manual.js");
        std::fs::write(&good, "require(\"./app\");\n").unwrap();
        let accepted = agent.set_entry_location(&good).await.unwrap();
        assert!(accepted.is_file());
    }

    #[tokio::test]
    async fn mutate_identity_generates_and_restores() {
        let dir = TempDir::new().unwrap();
        let agent = test_agent(&dir);

        let fresh = agent.mutate_identity(None).await.unwrap();
        assert_eq!(fresh.machine_code.len(), 64);

        let wanted = IdentityState {
            machine_code: "c0de".repeat(16),
            ..Default::default()
        };
        let restored = agent.mutate_identity(Some(&wanted)).await.unwrap();
        assert_eq!(restored.machine_code, wanted.machine_code);
    }

    #[tokio::test]
    async fn switch_account_roundtrips_through_state_db() {
        let dir = TempDir::new().unwrap();
        let agent = test_agent(&dir);

        agent
            .switch_account("dev@example.com", "tok-abc", false)
            .await
            .unwrap();

        let id = agent.read_identity().await.unwrap();
        assert_eq!(id.current_account, "dev@example.com");
        assert_eq!(id.auth_token, "tok-abc");
    }
}
