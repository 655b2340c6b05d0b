//! Tests for the `installed`, `runtime-path` and `present` commands.

use predicates::prelude::*;
use tempfile::TempDir;

use super::{vrbroker, write_registry};

/// Test that a missing registry reports no runtime.
#[test]
fn test_installed_without_registry() {
    let temp = TempDir::new().unwrap();
    let mut cmd = vrbroker();
    cmd.arg("installed")
        .arg("--registry")
        .arg(temp.path().join("missing.vrpath"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Runtime installed: no"));
}

/// Test that a registered, existing runtime directory counts as installed.
#[test]
fn test_installed_with_registry() {
    let temp = TempDir::new().unwrap();
    let registry = temp.path().join("openvrpaths.vrpath");
    write_registry(&registry, temp.path());

    let mut cmd = vrbroker();
    cmd.arg("--json").arg("installed").arg("--registry").arg(&registry);

    let output = cmd.assert().success().get_output().stdout.clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["installed"], true);
}

/// Test that the runtime override wins over the registry file.
#[test]
fn test_installed_with_override() {
    let temp = TempDir::new().unwrap();
    let mut cmd = vrbroker();
    cmd.env("VR_OVERRIDE", temp.path())
        .arg("installed")
        .arg("--registry")
        .arg(temp.path().join("missing.vrpath"));

    // Without a registry file only a complete set of overrides is used.
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Runtime installed: no"));
}

/// Test that a complete set of overrides needs no registry file.
#[test]
fn test_installed_with_complete_overrides() {
    let temp = TempDir::new().unwrap();
    let mut cmd = vrbroker();
    cmd.env("VR_OVERRIDE", temp.path())
        .env("VR_CONFIG_PATH", temp.path())
        .env("VR_LOG_PATH", temp.path())
        .arg("installed")
        .arg("--registry")
        .arg(temp.path().join("missing.vrpath"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Runtime installed: yes"));
}

/// Test that runtime-path fails without a runtime.
#[test]
fn test_runtime_path_missing() {
    let temp = TempDir::new().unwrap();
    let mut cmd = vrbroker();
    cmd.arg("runtime-path")
        .arg("--registry")
        .arg(temp.path().join("missing.vrpath"));

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No runtime installed"));
}

/// Test that runtime-path prints the registered directory.
#[test]
fn test_runtime_path_registered() {
    let temp = TempDir::new().unwrap();
    let registry = temp.path().join("openvrpaths.vrpath");
    write_registry(&registry, temp.path());

    let mut cmd = vrbroker();
    cmd.arg("runtime-path").arg("--registry").arg(&registry);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(temp.path().to_string_lossy().as_ref()));
}

/// Test the presence probe without an installed runtime.
#[test]
fn test_present_without_runtime() {
    let temp = TempDir::new().unwrap();
    let mut cmd = vrbroker();
    cmd.arg("present")
        .arg("--registry")
        .arg(temp.path().join("missing.vrpath"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("HMD present: no"));
}
