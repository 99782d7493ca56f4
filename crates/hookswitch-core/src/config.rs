use crate::error::{CoreError, Result};
use crate::io;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// TargetConfig
// ---------------------------------------------------------------------------

/// Which desktop application we manage and how to reach it. Defaults model
/// the Cursor editor; every field can be overridden in
/// `~/.hookswitch/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Display / bundle name of the target application.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Process image names to match when checking/terminating, per platform
    /// spelling (`Cursor`, `cursor`, `Cursor.exe`).
    #[serde(default = "default_process_names")]
    pub process_names: Vec<String>,

    /// Override for the target's data directory (where `storage.json` and
    /// the state database live). `None` = platform default.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Override for the entry script path. `None` = automatic discovery.
    #[serde(default)]
    pub entry_script: Option<PathBuf>,

    /// Base URL of the usage API.
    #[serde(default = "default_usage_api_base")]
    pub usage_api_base: String,

    /// How long to wait after terminating the target before retrying a
    /// patch, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Operator name stamped into history records. `None` = `$USER`.
    #[serde(default)]
    pub operator: Option<String>,
}

fn default_app_name() -> String {
    "Cursor".to_string()
}

fn default_process_names() -> Vec<String> {
    vec![
        "Cursor".to_string(),
        "cursor".to_string(),
        "Cursor.exe".to_string(),
    ]
}

fn default_usage_api_base() -> String {
    "https://api2.cursor.sh".to_string()
}

fn default_settle_ms() -> u64 {
    1500
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            process_names: default_process_names(),
            data_dir: None,
            entry_script: None,
            usage_api_base: default_usage_api_base(),
            settle_ms: default_settle_ms(),
            operator: None,
        }
    }
}

impl TargetConfig {
    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: TargetConfig = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(path, data.as_bytes())?;
        Ok(())
    }

    /// Default config file location: `~/.hookswitch/config.yaml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = home::home_dir().ok_or(CoreError::HomeNotFound)?;
        Ok(home.join(".hookswitch").join("config.yaml"))
    }

    pub fn operator(&self) -> String {
        self.operator
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn settle(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.settle_ms)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
