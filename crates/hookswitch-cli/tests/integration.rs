#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Write a config that points every path into the temp tree and the process
/// check at a name that cannot exist, so tests never touch a real install.
fn write_config(dir: &TempDir, entry_exists: bool) -> std::path::PathBuf {
    let entry = dir.path().join("main.js");
    if entry_exists {
        std::fs::write(&entry, "require(\"./app\");\n").unwrap();
    }
    let config_path = dir.path().join("config.yaml");
    let config = format!(
        "app_name: FakeEditor\n\
         process_names: [hookswitch-itest-proc]\n\
         data_dir: {}\n\
         entry_script: {}\n\
         settle_ms: 1\n\
         operator: itest\n",
        dir.path().join("data").display(),
        entry.display(),
    );
    std::fs::write(&config_path, config).unwrap();
    config_path
}

fn hookswitch(dir: &TempDir, config_path: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("hookswitch").unwrap();
    // Redirect HOME so the history log lands in the temp tree.
    cmd.env("HOME", dir.path())
        .env("HOOKSWITCH_CONFIG", config_path);
    cmd
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_show_prints_effective_values() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, true);

    hookswitch(&dir, &config_path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FakeEditor"));
}

#[test]
fn config_path_prints_the_path() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, true);

    hookswitch(&dir, &config_path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.yaml"));
}

// ---------------------------------------------------------------------------
// status / apply / restore
// ---------------------------------------------------------------------------

#[test]
fn status_reports_unpatched_and_not_running() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, true);

    hookswitch(&dir, &config_path)
        .args(["--json", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"hook_status\": \"not_applied\""))
        .stdout(predicate::str::contains("\"running\": false"));
}

#[test]
fn apply_patches_and_restore_reverts() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, true);
    let entry = dir.path().join("main.js");
    let original = std::fs::read_to_string(&entry).unwrap();

    hookswitch(&dir, &config_path)
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("done"));

    let patched = std::fs::read_to_string(&entry).unwrap();
    assert!(patched.contains("hookswitch-hook"));

    hookswitch(&dir, &config_path)
        .args(["--json", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"hook_status\": \"applied\""));

    hookswitch(&dir, &config_path)
        .arg("restore")
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(&entry).unwrap(), original);
}

#[test]
fn missing_entry_defers_to_manual_path() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, false);

    hookswitch(&dir, &config_path)
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("set-entry"));

    // Supplying the path replays the deferred apply.
    let entry = dir.path().join("main.js");
    std::fs::write(&entry, "require(\"./app\");\n").unwrap();

    hookswitch(&dir, &config_path)
        .args(["set-entry", entry.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("done"));

    assert!(std::fs::read_to_string(&entry)
        .unwrap()
        .contains("hookswitch-hook"));
}

#[test]
fn set_entry_rejects_a_bad_path() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, true);

    hookswitch(&dir, &config_path)
        .args(["set-entry", dir.path().join("absent.js").to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid entry script path"));
}

// ---------------------------------------------------------------------------
// identity / history
// ---------------------------------------------------------------------------

#[test]
fn reset_writes_identity_and_history() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, true);

    hookswitch(&dir, &config_path)
        .args(["--json", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("machine_code"));

    assert!(dir
        .path()
        .join("data/User/globalStorage/storage.json")
        .exists());

    hookswitch(&dir, &config_path)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("machine_reset"))
        .stdout(predicate::str::contains("itest"));
}

#[test]
fn switch_rejects_invalid_email() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, true);

    hookswitch(&dir, &config_path)
        .args(["switch", "--email", "not-an-email", "--token", "tok"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid email"));
}

#[test]
fn switch_updates_the_state_db() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, true);

    hookswitch(&dir, &config_path)
        .args([
            "switch",
            "--email",
            "dev@example.com",
            "--token",
            "tok-123",
        ])
        .assert()
        .success();

    hookswitch(&dir, &config_path)
        .args(["--json", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dev@example.com"));
}
