//! Filesystem geography: where the target application keeps its state and
//! where hookswitch keeps its own.

use std::path::PathBuf;

use hookswitch_core::{BackendError, BackendResult, TargetConfig};

// ─── File name constants ──────────────────────────────────────────────────

pub const STORAGE_FILE_NAME: &str = "storage.json";
pub const STATE_DB_FILE_NAME: &str = "state.vscdb";
pub const ENTRY_SCRIPT_NAME: &str = "main.js";

pub const HOOKSWITCH_HOME_DIR: &str = ".hookswitch";
pub const HISTORY_FILE_NAME: &str = "history.jsonl";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

// ─── hookswitch home ──────────────────────────────────────────────────────

pub fn home_dir() -> BackendResult<PathBuf> {
    home::home_dir().ok_or_else(|| BackendError::Other("unable to locate home directory".into()))
}

pub fn hookswitch_home() -> BackendResult<PathBuf> {
    Ok(home_dir()?.join(HOOKSWITCH_HOME_DIR))
}

pub fn history_file() -> BackendResult<PathBuf> {
    Ok(hookswitch_home()?.join(HISTORY_FILE_NAME))
}

// ─── Target application paths ─────────────────────────────────────────────

/// The target's per-user data directory. An explicit `data_dir` in the
/// config wins; otherwise the platform convention for Electron apps.
pub fn app_data_dir(config: &TargetConfig) -> BackendResult<PathBuf> {
    if let Some(dir) = &config.data_dir {
        return Ok(dir.clone());
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return Ok(PathBuf::from(appdata).join(&config.app_name));
        }
        Ok(home_dir()?
            .join("AppData")
            .join("Roaming")
            .join(&config.app_name))
    }

    #[cfg(target_os = "macos")]
    {
        Ok(home_dir()?
            .join("Library")
            .join("Application Support")
            .join(&config.app_name))
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            if !xdg.is_empty() {
                return Ok(PathBuf::from(xdg).join(&config.app_name));
            }
        }
        Ok(home_dir()?.join(".config").join(&config.app_name))
    }
}

/// `storage.json` — the JSON file holding the telemetry machine ids.
pub fn storage_file(config: &TargetConfig) -> BackendResult<PathBuf> {
    Ok(app_data_dir(config)?
        .join("User")
        .join("globalStorage")
        .join(STORAGE_FILE_NAME))
}

/// `state.vscdb` — the SQLite database holding the signed-in account.
pub fn state_db(config: &TargetConfig) -> BackendResult<PathBuf> {
    Ok(app_data_dir(config)?
        .join("User")
        .join("globalStorage")
        .join(STATE_DB_FILE_NAME))
}

/// Candidate locations for the target's entry script, most specific first.
/// The config override always leads; install-convention paths follow, then
/// a PATH-derived guess.
pub fn entry_script_candidates(config: &TargetConfig) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(path) = &config.entry_script {
        candidates.push(path.clone());
    }

    let app = &config.app_name;
    let lower = app.to_lowercase();
    let tail = PathBuf::from("resources")
        .join("app")
        .join("out")
        .join(ENTRY_SCRIPT_NAME);

    #[cfg(target_os = "macos")]
    {
        candidates.push(
            PathBuf::from("/Applications")
                .join(format!("{app}.app"))
                .join("Contents")
                .join("Resources")
                .join("app")
                .join("out")
                .join(ENTRY_SCRIPT_NAME),
        );
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(local) = std::env::var_os("LOCALAPPDATA") {
            candidates.push(
                PathBuf::from(local)
                    .join("Programs")
                    .join(&lower)
                    .join(&tail),
            );
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        for root in ["/usr/share", "/usr/lib", "/opt"] {
            candidates.push(PathBuf::from(root).join(&lower).join(&tail));
        }
    }

    // Last resort: follow the launcher on PATH back to its install tree.
    if let Ok(bin) = which::which(&lower) {
        let resolved = std::fs::canonicalize(&bin).unwrap_or(bin);
        if let Some(install_dir) = resolved.parent().and_then(|p| p.parent()) {
            candidates.push(install_dir.join(&tail));
        }
    }

    candidates
}

// ─── Tests ────────────────────────────────────────────────────────────────
