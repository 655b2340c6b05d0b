//! Tests for the `probe` command.

use predicates::prelude::*;
use tempfile::TempDir;

use super::{vrbroker, write_registry};

/// Test probe without a registry reports the init failure.
#[test]
fn test_probe_without_registry() {
    let temp = TempDir::new().unwrap();
    let mut cmd = vrbroker();
    cmd.arg("probe")
        .arg("--registry")
        .arg(temp.path().join("missing.vrpath"));

    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("VRInitError_Init_PathRegistryNotFound"));
}

/// Test probe against a runtime directory without a bin layout.
#[test]
fn test_probe_corrupt_installation() {
    let temp = TempDir::new().unwrap();
    let registry = temp.path().join("openvrpaths.vrpath");
    write_registry(&registry, temp.path());

    let mut cmd = vrbroker();
    cmd.arg("--json").arg("probe").arg("--registry").arg(&registry);

    let output = cmd.assert().failure().code(1).get_output().stdout.clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["error"], 101);
    assert_eq!(value["symbol"], "VRInitError_Init_InstallationCorrupt");
}

/// Test probe rejects an unknown application type.
#[test]
fn test_probe_invalid_app_type() {
    let mut cmd = vrbroker();
    cmd.arg("probe").arg("--app-type").arg("spaceship");

    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unknown application type"));
}

/// Test probe against the mock runtime library.
#[test]
#[ignore = "requires vrbroker-mock-runtime to be built"]
fn test_probe_mock_runtime() {
    use vrbroker_core::platform::ModuleLayout;

    #[cfg(target_os = "windows")]
    let lib_name = "vrbroker_mock_runtime.dll";
    #[cfg(target_os = "macos")]
    let lib_name = "libvrbroker_mock_runtime.dylib";
    #[cfg(all(unix, not(target_os = "macos")))]
    let lib_name = "libvrbroker_mock_runtime.so";

    let source = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../target/debug")
        .join(lib_name);

    let temp = TempDir::new().unwrap();
    let runtime = temp.path().join("runtime");
    let module = ModuleLayout::host().module_path(&runtime);
    std::fs::create_dir_all(module.parent().unwrap()).unwrap();
    std::fs::copy(&source, &module).unwrap();

    let registry = temp.path().join("openvrpaths.vrpath");
    write_registry(&registry, &runtime);

    let mut cmd = vrbroker();
    cmd.arg("--json")
        .arg("probe")
        .arg("--registry")
        .arg(&registry)
        .arg("-i")
        .arg("IVRSystem_022")
        .arg("-i")
        .arg("IVROverlay_027");

    let output = cmd.assert().success().get_output().stdout.clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(value["app_type"], "utility");
    assert_eq!(value["interfaces"][0]["valid"], true);
    assert!(value["interfaces"][0]["address"].is_string());
    assert_eq!(value["interfaces"][0]["fn_table_valid"], true);
    assert_eq!(value["interfaces"][1]["fn_table_valid"], false);
    assert_eq!(value["interfaces"][1]["valid"], false);
}
