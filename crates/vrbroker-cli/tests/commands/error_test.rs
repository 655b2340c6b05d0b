//! Tests for the `error` command.

use predicates::prelude::*;

use super::vrbroker;

/// Test that a known code prints its symbol and description.
#[test]
fn test_error_known_code() {
    let mut cmd = vrbroker();
    cmd.arg("error").arg("108");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("VRInitError_Init_HmdNotFound"))
        .stdout(predicate::str::contains("(108)"));
}

/// Test the success code.
#[test]
fn test_error_none() {
    let mut cmd = vrbroker();
    cmd.arg("error").arg("0");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("VRInitError_None"))
        .stdout(predicate::str::contains("No Error (0)"));
}

/// Test that unknown and negative codes are accepted.
#[test]
fn test_error_unknown_code() {
    let mut cmd = vrbroker();
    cmd.arg("error").arg("-7");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Unknown error (-7)"));
}

/// Test JSON output.
#[test]
fn test_error_json() {
    let mut cmd = vrbroker();
    cmd.arg("error").arg("109").arg("--json");

    let output = cmd.assert().success().get_output().stdout.clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(value["code"], 109);
    assert_eq!(value["symbol"], "VRInitError_Init_NotInitialized");
}

/// Test that a non-numeric code is rejected.
#[test]
fn test_error_requires_number() {
    let mut cmd = vrbroker();
    cmd.arg("error").arg("hmd");

    cmd.assert().failure().code(2);
}
