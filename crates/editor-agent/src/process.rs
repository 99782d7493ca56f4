//! Process control for the target application: liveness checks, bounded
//! termination, launch.

use std::time::Duration;

use tokio::process::Command;

use hookswitch_core::{BackendError, BackendResult, TargetConfig};

/// How many liveness probes to run after a kill before giving up.
const KILL_RETRY_BUDGET: u32 = 10;
const KILL_RETRY_INTERVAL: Duration = Duration::from_millis(300);

// ─── Command construction ─────────────────────────────────────────────────

fn hidden_command(program: &str) -> Command {
    #[allow(unused_mut)]
    let mut cmd = Command::new(program);
    #[cfg(target_os = "windows")]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd
}

// ─── Liveness ─────────────────────────────────────────────────────────────

/// True when any of the given process image names is alive.
pub async fn query_running(names: &[String]) -> BackendResult<bool> {
    for name in names {
        if query_one(name).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(target_os = "windows")]
async fn query_one(name: &str) -> BackendResult<bool> {
    let output = hidden_command("tasklist")
        .args(["/FI", &format!("IMAGENAME eq {name}"), "/NH"])
        .output()
        .await
        .map_err(BackendError::Io)?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_ascii_lowercase();
    Ok(stdout.contains(&name.to_ascii_lowercase()))
}

#[cfg(not(target_os = "windows"))]
async fn query_one(name: &str) -> BackendResult<bool> {
    match hidden_command("pgrep").args(["-x", name]).output().await {
        // pgrep exits 0 when at least one process matched, 1 when none did.
        Ok(output) => Ok(output.status.success()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => query_via_ps(name).await,
        Err(e) => Err(BackendError::Io(e)),
    }
}

/// Fallback for hosts without procps' pgrep.
#[cfg(not(target_os = "windows"))]
async fn query_via_ps(name: &str) -> BackendResult<bool> {
    let output = hidden_command("ps")
        .args(["-Ao", "comm="])
        .output()
        .await
        .map_err(BackendError::Io)?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().any(|line| {
        let comm = line.trim();
        comm == name || comm.ends_with(&format!("/{name}"))
    }))
}

// ─── Termination ──────────────────────────────────────────────────────────

/// Kill every matching process, then poll until all are gone or the retry
/// budget runs out (`ProcessBusy`). OS policy refusals surface as
/// `PermissionDenied` so the caller can offer a remediation path.
pub async fn terminate(names: &[String], force: bool) -> BackendResult<()> {
    for name in names {
        kill_one(name, force).await?;
    }

    for _ in 0..KILL_RETRY_BUDGET {
        if !query_running(names).await? {
            return Ok(());
        }
        tokio::time::sleep(KILL_RETRY_INTERVAL).await;
    }
    Err(BackendError::ProcessBusy)
}

#[cfg(target_os = "windows")]
async fn kill_one(name: &str, force: bool) -> BackendResult<()> {
    let mut cmd = hidden_command("taskkill");
    cmd.args(["/IM", name, "/T"]);
    if force {
        cmd.arg("/F");
    }
    let output = cmd.output().await.map_err(BackendError::Io)?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    // 128: no such process — nothing to kill is not a failure.
    match classify_kill_failure(output.status.code(), &[0, 128], &stderr) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(not(target_os = "windows"))]
async fn kill_one(name: &str, force: bool) -> BackendResult<()> {
    let mut cmd = hidden_command("pkill");
    if force {
        cmd.arg("-9");
    }
    cmd.args(["-x", name]);
    let output = cmd.output().await.map_err(BackendError::Io)?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    // 1: no process matched — nothing to kill is not a failure.
    match classify_kill_failure(output.status.code(), &[0, 1], &stderr) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Map a kill command's exit into a `BackendError`, or `None` on success.
/// Permission wording varies per platform; matching is case-insensitive.
fn classify_kill_failure(code: Option<i32>, ok_codes: &[i32], stderr: &str) -> Option<BackendError> {
    let lowered = stderr.to_ascii_lowercase();
    if lowered.contains("access is denied")
        || lowered.contains("operation not permitted")
        || lowered.contains("permission denied")
    {
        return Some(BackendError::PermissionDenied);
    }
    match code {
        Some(c) if ok_codes.contains(&c) => None,
        Some(c) => Some(BackendError::Other(format!(
            "kill command exited with code {c}: {}",
            stderr.trim()
        ))),
        None => Some(BackendError::Other(
            "kill command terminated by signal".into(),
        )),
    }
}

// ─── Launch ───────────────────────────────────────────────────────────────

/// Start the target application detached from us.
pub fn launch(config: &TargetConfig) -> BackendResult<()> {
    #[cfg(target_os = "macos")]
    {
        let bundle =
            std::path::PathBuf::from("/Applications").join(format!("{}.app", config.app_name));
        if bundle.exists() {
            open::that_detached(&bundle).map_err(BackendError::Io)?;
            return Ok(());
        }
    }

    if let Ok(bin) = which::which(config.app_name.to_lowercase()) {
        hidden_command(&bin.to_string_lossy())
            .spawn()
            .map_err(BackendError::Io)?;
        return Ok(());
    }

    Err(BackendError::Other(format!(
        "unable to locate the {} application",
        config.app_name
    )))
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_exit_codes_are_not_failures() {
        assert!(classify_kill_failure(Some(0), &[0, 1], "").is_none());
        assert!(classify_kill_failure(Some(1), &[0, 1], "").is_none());
    }

    #[test]
    fn permission_wording_maps_to_permission_denied() {
        for stderr in [
            "ERROR: The process could not be terminated. Access is denied.",
            "pkill: killing pid 123 failed: Operation not permitted",
            "kill: permission denied",
        ] {
            assert!(matches!(
                classify_kill_failure(Some(1), &[0], stderr),
                Some(BackendError::PermissionDenied)
            ));
        }
    }

    #[test]
    fn unknown_exit_code_is_other() {
        let err = classify_kill_failure(Some(2), &[0, 1], "something odd").unwrap();
        assert!(matches!(err, BackendError::Other(_)));
    }

    #[test]
    fn signal_death_is_other() {
        assert!(matches!(
            classify_kill_failure(None, &[0], ""),
            Some(BackendError::Other(_))
        ));
    }

    #[tokio::test]
    async fn nonexistent_process_is_not_running() {
        let names = vec!["hookswitch-no-such-process".to_string()];
        assert!(!query_running(&names).await.unwrap());
    }
}
