//! Marker-delimited patch injection into the target's entry script.
//!
//! The payload is wrapped in begin/end marker comments so presence can be
//! detected and the block replaced or stripped without diffing. Before the
//! first injection the pristine script is copied to a `.bak` sibling, kept
//! as a restore fallback.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use hookswitch_core::io::atomic_write;
use hookswitch_core::{BackendError, BackendResult};

use crate::identity::TelemetryIds;

pub const HOOK_BEGIN_MARKER: &str = "// <hookswitch-hook>";
pub const HOOK_END_MARKER: &str = "// </hookswitch-hook>";
pub const BACKUP_SUFFIX: &str = ".hookswitch.bak";

/// Runtime payload template. The hook intercepts the shell-outs the target
/// uses to read platform machine ids and answers with our pinned values; its
/// runtime behavior beyond that is the target's problem, not ours.
const HOOK_TEMPLATE: &str = r#"(() => {
  const ids = {
    machineId: "__HS_MACHINE_ID__",
    macMachineId: "__HS_MAC_MACHINE_ID__",
    devDeviceId: "__HS_DEV_DEVICE_ID__",
    sqmId: "__HS_SQM_ID__",
  };
  const cp = require("child_process");
  const realExecSync = cp.execSync;
  cp.execSync = function (command, ...rest) {
    const text = String(command);
    if (text.includes("IOPlatformUUID")) {
      return `"IOPlatformUUID" = "${ids.macMachineId}"`;
    }
    if (text.includes("MachineGuid")) {
      return `    MachineGuid    REG_SZ    ${ids.devDeviceId}`;
    }
    if (text.includes("/etc/machine-id") || text.includes("machine-id")) {
      return ids.machineId;
    }
    return realExecSync.call(cp, command, ...rest);
  };
})();"#;

// ─── Payload ──────────────────────────────────────────────────────────────

/// Render the full marker-wrapped block for the given ids.
pub fn build_block(ids: &TelemetryIds) -> String {
    let body = HOOK_TEMPLATE
        .replace("__HS_MACHINE_ID__", &ids.machine_id)
        .replace("__HS_MAC_MACHINE_ID__", &ids.mac_machine_id)
        .replace("__HS_DEV_DEVICE_ID__", &ids.dev_device_id)
        .replace("__HS_SQM_ID__", &ids.sqm_id);
    format!("{HOOK_BEGIN_MARKER}\n{body}\n{HOOK_END_MARKER}\n")
}

// ─── Status ───────────────────────────────────────────────────────────────

pub fn is_patched(source: &str) -> bool {
    source.contains(HOOK_BEGIN_MARKER)
}

pub fn status(entry: &Path) -> BackendResult<bool> {
    if !entry.is_file() {
        return Ok(false);
    }
    let source = fs::read_to_string(entry).map_err(BackendError::Io)?;
    Ok(is_patched(&source))
}

// ─── Apply / restore ──────────────────────────────────────────────────────

/// Inject (or refresh) the hook block at the top of the entry script.
/// Idempotent: an existing block is replaced, never duplicated.
pub fn apply(entry: &Path, block: &str) -> BackendResult<()> {
    let source = fs::read_to_string(entry).map_err(BackendError::Io)?;
    ensure_backup(entry, &source)?;

    let patched = match find_block(&source) {
        Some((start, end)) => {
            let mut out = String::with_capacity(source.len() + block.len());
            out.push_str(&source[..start]);
            out.push_str(block);
            out.push_str(&source[end..]);
            out
        }
        None => format!("{block}{source}"),
    };

    atomic_write(entry, patched.as_bytes()).map_err(BackendError::Io)
}

/// Remove the hook block. Prefers stripping the markers in place; falls
/// back to the pristine backup when the markers are gone but a backup
/// exists. A script that was never patched is left untouched.
pub fn restore(entry: &Path) -> BackendResult<()> {
    let source = fs::read_to_string(entry).map_err(BackendError::Io)?;

    if let Some((start, end)) = find_block(&source) {
        let mut out = String::with_capacity(source.len());
        out.push_str(&source[..start]);
        out.push_str(&source[end..]);
        return atomic_write(entry, out.as_bytes()).map_err(BackendError::Io);
    }

    let backup = backup_path(entry);
    if backup.is_file() {
        let pristine = fs::read(&backup).map_err(BackendError::Io)?;
        return atomic_write(entry, &pristine).map_err(BackendError::Io);
    }

    Ok(())
}

// ─── Internal ─────────────────────────────────────────────────────────────

pub fn backup_path(entry: &Path) -> PathBuf {
    let mut name = OsString::from(entry.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Byte range of the hook block including its trailing newline.
fn find_block(source: &str) -> Option<(usize, usize)> {
    let start = source.find(HOOK_BEGIN_MARKER)?;
    let end_marker = source[start..].find(HOOK_END_MARKER)?;
    let mut end = start + end_marker + HOOK_END_MARKER.len();
    if source[end..].starts_with('\n') {
        end += 1;
    }
    Some((start, end))
}

/// Copy the pristine script aside once. An existing backup is never
/// overwritten — it must stay pristine across repeated applies.
fn ensure_backup(entry: &Path, source: &str) -> BackendResult<()> {
    if is_patched(source) {
        return Ok(());
    }
    let backup = backup_path(entry);
    if backup.exists() {
        return Ok(());
    }
    atomic_write(&backup, source.as_bytes()).map_err(BackendError::Io)
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity;
    use tempfile::TempDir;

    const ORIGINAL: &str = "console.log(\"boot\");\nrequire(\"./app\");\n";

    fn entry_with_original(dir: &TempDir) -> PathBuf {
        let entry = dir.path().join("main.js");
        fs::write(&entry, ORIGINAL).unwrap();
        entry
    }

    fn block() -> String {
        build_block(&identity::generate())
    }

    #[test]
    fn apply_prepends_block_and_keeps_original() {
        let dir = TempDir::new().unwrap();
        let entry = entry_with_original(&dir);

        apply(&entry, &block()).unwrap();

        let patched = fs::read_to_string(&entry).unwrap();
        assert!(patched.starts_with(HOOK_BEGIN_MARKER));
        assert!(patched.ends_with(ORIGINAL));
        assert!(status(&entry).unwrap());
    }

    #[test]
    fn apply_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let entry = entry_with_original(&dir);

        apply(&entry, &block()).unwrap();
        apply(&entry, &block()).unwrap();

        let patched = fs::read_to_string(&entry).unwrap();
        assert_eq!(patched.matches(HOOK_BEGIN_MARKER).count(), 1);
        assert_eq!(patched.matches(HOOK_END_MARKER).count(), 1);
    }

    #[test]
    fn backup_is_created_once_and_stays_pristine() {
        let dir = TempDir::new().unwrap();
        let entry = entry_with_original(&dir);

        apply(&entry, &block()).unwrap();
        apply(&entry, &block()).unwrap();

        let backup = backup_path(&entry);
        assert_eq!(fs::read_to_string(backup).unwrap(), ORIGINAL);
    }

    #[test]
    fn restore_strips_markers_back_to_original() {
        let dir = TempDir::new().unwrap();
        let entry = entry_with_original(&dir);

        apply(&entry, &block()).unwrap();
        restore(&entry).unwrap();

        assert_eq!(fs::read_to_string(&entry).unwrap(), ORIGINAL);
        assert!(!status(&entry).unwrap());
    }

    #[test]
    fn restore_falls_back_to_backup() {
        let dir = TempDir::new().unwrap();
        let entry = entry_with_original(&dir);

        apply(&entry, &block()).unwrap();
        // Simulate an update that mangled the markers but left the backup.
        fs::write(&entry, "garbled by updater\n").unwrap();

        restore(&entry).unwrap();
        assert_eq!(fs::read_to_string(&entry).unwrap(), ORIGINAL);
    }

    #[test]
    fn restore_of_unpatched_script_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let entry = entry_with_original(&dir);

        restore(&entry).unwrap();
        assert_eq!(fs::read_to_string(&entry).unwrap(), ORIGINAL);
    }

    #[test]
    fn block_carries_all_four_ids() {
        let ids = identity::generate();
        let block = build_block(&ids);
        assert!(block.contains(&ids.machine_id));
        assert!(block.contains(&ids.mac_machine_id));
        assert!(block.contains(&ids.dev_device_id));
        assert!(block.contains(&ids.sqm_id));
    }
}
