//! Machine identity: the telemetry ids the target persists in
//! `storage.json`.

use rand::RngCore;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use hookswitch_core::io::atomic_write;
use hookswitch_core::{BackendError, BackendResult};

pub const MACHINE_ID_KEY: &str = "telemetry.machineId";
pub const MAC_MACHINE_ID_KEY: &str = "telemetry.macMachineId";
pub const DEV_DEVICE_ID_KEY: &str = "telemetry.devDeviceId";
pub const SQM_ID_KEY: &str = "telemetry.sqmId";

// ─── TelemetryIds ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryIds {
    /// 64-char hex.
    pub machine_id: String,
    /// 64-char hex.
    pub mac_machine_id: String,
    /// Plain uuid v4.
    pub dev_device_id: String,
    /// Braced upper-case uuid, Windows SQM style.
    pub sqm_id: String,
}

/// Generate a fresh, internally unrelated id set.
pub fn generate() -> TelemetryIds {
    TelemetryIds {
        machine_id: random_hex64(),
        mac_machine_id: random_hex64(),
        dev_device_id: Uuid::new_v4().to_string(),
        sqm_id: format!("{{{}}}", Uuid::new_v4().to_string().to_uppercase()),
    }
}

fn random_hex64() -> String {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    hex::encode(Sha256::digest(seed))
}

// ─── storage.json access ──────────────────────────────────────────────────

/// Read the primary machine id, `None` when the file or key is missing.
pub fn read_machine_id(storage: &Path) -> BackendResult<Option<String>> {
    let Some(root) = read_root(storage)? else {
        return Ok(None);
    };
    Ok(root
        .get(MACHINE_ID_KEY)
        .and_then(Value::as_str)
        .map(str::to_owned))
}

/// Read all four ids, generating placeholders for any that are missing so
/// the hook payload always has a full set to pin.
pub fn read_ids_or_generate(storage: &Path) -> BackendResult<TelemetryIds> {
    let generated = generate();
    let Some(root) = read_root(storage)? else {
        return Ok(generated);
    };
    let pick = |key: &str, fallback: String| {
        root.get(key)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or(fallback)
    };
    Ok(TelemetryIds {
        machine_id: pick(MACHINE_ID_KEY, generated.machine_id),
        mac_machine_id: pick(MAC_MACHINE_ID_KEY, generated.mac_machine_id),
        dev_device_id: pick(DEV_DEVICE_ID_KEY, generated.dev_device_id),
        sqm_id: pick(SQM_ID_KEY, generated.sqm_id),
    })
}

/// Write a full id set, preserving every other key in the file.
pub fn write_ids(storage: &Path, ids: &TelemetryIds) -> BackendResult<()> {
    let mut root = read_root(storage)?.unwrap_or_default();
    root.insert(MACHINE_ID_KEY.into(), Value::String(ids.machine_id.clone()));
    root.insert(
        MAC_MACHINE_ID_KEY.into(),
        Value::String(ids.mac_machine_id.clone()),
    );
    root.insert(
        DEV_DEVICE_ID_KEY.into(),
        Value::String(ids.dev_device_id.clone()),
    );
    root.insert(SQM_ID_KEY.into(), Value::String(ids.sqm_id.clone()));
    write_root(storage, &root)
}

/// Overwrite only the primary machine id (used by the compensating restore,
/// which must not disturb ids the caller never snapshotted).
pub fn write_machine_id(storage: &Path, machine_id: &str) -> BackendResult<()> {
    let mut root = read_root(storage)?.unwrap_or_default();
    root.insert(MACHINE_ID_KEY.into(), Value::String(machine_id.to_owned()));
    write_root(storage, &root)
}

fn read_root(storage: &Path) -> BackendResult<Option<Map<String, Value>>> {
    if !storage.is_file() {
        return Ok(None);
    }
    let data = fs::read_to_string(storage).map_err(BackendError::Io)?;
    let value: Value = serde_json::from_str(&data)
        .map_err(|e| BackendError::Other(format!("malformed {}: {e}", storage.display())))?;
    match value {
        Value::Object(map) => Ok(Some(map)),
        _ => Err(BackendError::Other(format!(
            "{} is not a JSON object",
            storage.display()
        ))),
    }
}

fn write_root(storage: &Path, root: &Map<String, Value>) -> BackendResult<()> {
    let data = serde_json::to_string_pretty(&Value::Object(root.clone()))
        .map_err(|e| BackendError::Other(e.to_string()))?;
    atomic_write(storage, data.as_bytes()).map_err(BackendError::Io)
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn generated_ids_have_expected_shapes() {
        let ids = generate();
        assert_eq!(ids.machine_id.len(), 64);
        assert!(ids.machine_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ids.mac_machine_id.len(), 64);
        assert!(ids.sqm_id.starts_with('{') && ids.sqm_id.ends_with('}'));
        assert!(Uuid::parse_str(&ids.dev_device_id).is_ok());
    }

    #[test]
    fn successive_generations_differ() {
        assert_ne!(generate().machine_id, generate().machine_id);
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = TempDir::new().unwrap();
        let storage = dir.path().join("storage.json");

        let ids = generate();
        write_ids(&storage, &ids).unwrap();

        assert_eq!(read_machine_id(&storage).unwrap().as_deref(), Some(ids.machine_id.as_str()));
        assert_eq!(read_ids_or_generate(&storage).unwrap(), ids);
    }

    #[test]
    fn write_preserves_unrelated_keys() {
        let dir = TempDir::new().unwrap();
        let storage = dir.path().join("storage.json");
        fs::write(&storage, r#"{"window.zoomLevel": 2}"#).unwrap();

        write_ids(&storage, &generate()).unwrap();

        let text = fs::read_to_string(&storage).unwrap();
        assert!(text.contains("window.zoomLevel"));
        assert!(text.contains(MACHINE_ID_KEY));
    }

    #[test]
    fn machine_id_restore_leaves_other_ids_alone() {
        let dir = TempDir::new().unwrap();
        let storage = dir.path().join("storage.json");

        let ids = generate();
        write_ids(&storage, &ids).unwrap();
        write_machine_id(&storage, "previous-code").unwrap();

        let after = read_ids_or_generate(&storage).unwrap();
        assert_eq!(after.machine_id, "previous-code");
        assert_eq!(after.dev_device_id, ids.dev_device_id);
        assert_eq!(after.sqm_id, ids.sqm_id);
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_machine_id(&dir.path().join("storage.json"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn malformed_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = dir.path().join("storage.json");
        fs::write(&storage, "not json").unwrap();
        assert!(read_machine_id(&storage).is_err());
    }
}
