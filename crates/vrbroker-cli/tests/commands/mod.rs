//! Command-specific CLI tests.

use std::path::Path;

use assert_cmd::Command;

mod error_test;
mod installed_test;
mod probe_test;

/// The `vrbroker` binary with every path override cleared.
pub fn vrbroker() -> Command {
    let mut cmd = Command::cargo_bin("vrbroker").unwrap();
    cmd.env_remove("VR_OVERRIDE")
        .env_remove("VR_CONFIG_PATH")
        .env_remove("VR_LOG_PATH")
        .env_remove("VRBROKER_PATH_REGISTRY")
        .env_remove("VRBROKER_LOG_JSON")
        .env_remove("RUST_LOG");
    cmd
}

/// Write a registry file naming `runtime`.
pub fn write_registry(file: &Path, runtime: &Path) {
    let document = serde_json::json!({
        "jsonid": "vrpathreg",
        "version": 1,
        "runtime": [runtime],
        "config": [runtime.join("config")],
        "log": [runtime.join("logs")],
    });
    std::fs::write(file, serde_json::to_string_pretty(&document).unwrap()).unwrap();
}
