//! CLI integration tests

use std::process::Command;

/// Test that the CLI shows help with every subcommand
#[test]
fn test_cli_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "nbt-cli", "--", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("audit"), "Should show audit command");
    assert!(stdout.contains("profiles"), "Should show profiles command");
    assert!(stdout.contains("recommend"), "Should show recommend command");
    assert!(stdout.contains("apply"), "Should show apply command");
    assert!(stdout.contains("restore"), "Should show restore command");
}

/// Test that the profile catalog lists the four shipped profiles
#[test]
fn test_profiles_json_lists_catalog() {
    let output = Command::new("cargo")
        .args(["run", "-p", "nbt-cli", "--", "--format", "json", "profiles"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "profiles should succeed");
    for id in [
        "message-delivery-datacenter",
        "message-delivery-wan",
        "bulk-transfer-datacenter",
        "bulk-transfer-wan",
    ] {
        assert!(stdout.contains(id), "Should list {id}");
    }
}

/// Test that an unknown profile id is a hard usage error
#[test]
fn test_unknown_profile_fails() {
    let output = Command::new("cargo")
        .args([
            "run",
            "-p",
            "nbt-cli",
            "--",
            "recommend",
            "--profile",
            "no-such-profile",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "unknown profile should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unknown profile"),
        "Should name the bad profile id"
    );
}
