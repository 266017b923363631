use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> String {
    format!("tests/fixtures/{}", name)
}

/// Helper to create a Command for the gve binary
#[allow(deprecated)]
fn gve() -> Command {
    Command::cargo_bin("gve").expect("Failed to find gve binary")
}

// ============================================================================
// check command tests
// ============================================================================

#[test]
fn test_check_valid_manifest() {
    gve()
        .arg("check")
        .arg(fixture_path("customers.yml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("customers"))
        .stdout(predicate::str::contains("Manifest is valid"))
        .stdout(predicate::str::contains("Groups:"));
}

#[test]
fn test_check_json_format() {
    gve()
        .arg("check")
        .arg(fixture_path("customers.yml"))
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rule_count\""))
        .stdout(predicate::str::contains("\"group_count\": 1"));
}

#[test]
fn test_check_missing_file_fails() {
    gve()
        .arg("check")
        .arg("does-not-exist.yml")
        .assert()
        .failure();
}

#[test]
fn test_check_rejects_unbuildable_rule() {
    gve()
        .arg("check")
        .arg(fixture_path("broken_regex.yml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be built"));
}

// ============================================================================
// validate command tests
// ============================================================================

#[test]
fn test_validate_clean_data_passes() {
    gve()
        .arg("validate")
        .arg(fixture_path("customers.yml"))
        .arg(fixture_path("customers_valid.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation PASSED"));
}

#[test]
fn test_validate_bad_data_fails_with_addresses() {
    gve()
        .arg("validate")
        .arg(fixture_path("customers.yml"))
        .arg(fixture_path("customers_invalid.json"))
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Validation FAILED"))
        .stdout(predicate::str::contains("out of range"))
        .stdout(predicate::str::contains("does not match pattern"))
        .stdout(predicate::str::contains("Duplicate value"));
}

#[test]
fn test_validate_json_report() {
    gve()
        .arg("validate")
        .arg(fixture_path("customers.yml"))
        .arg(fixture_path("customers_invalid.json"))
        .arg("--format")
        .arg("json")
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"passed\": false"))
        .stdout(predicate::str::contains("\"error_count\""));
}

#[test]
fn test_validate_reports_statistics() {
    gve()
        .arg("validate")
        .arg(fixture_path("customers.yml"))
        .arg(fixture_path("customers_valid.json"))
        .arg("--stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Engine statistics:"));
}

// ============================================================================
// prune command tests
// ============================================================================

#[test]
fn test_prune_previews_invalid_rows() {
    gve()
        .arg("prune")
        .arg(fixture_path("customers.yml"))
        .arg(fixture_path("customers_invalid.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("row 1"))
        .stdout(predicate::str::contains("Preview only"));
}

#[test]
fn test_prune_by_rule_name() {
    gve()
        .arg("prune")
        .arg(fixture_path("customers.yml"))
        .arg(fixture_path("customers_invalid.json"))
        .arg("--mode")
        .arg("rule")
        .arg("--rule")
        .arg("age-range")
        .assert()
        .success()
        .stdout(predicate::str::contains("row 1"));
}

#[test]
fn test_prune_execute_clears_rows() {
    gve()
        .arg("prune")
        .arg(fixture_path("customers.yml"))
        .arg(fixture_path("customers_invalid.json"))
        .arg("--execute")
        .assert()
        .success()
        .stdout(predicate::str::contains("cleared for deletion"));
}

#[test]
fn test_prune_rejects_unknown_mode() {
    gve()
        .arg("prune")
        .arg(fixture_path("customers.yml"))
        .arg(fixture_path("customers_valid.json"))
        .arg("--mode")
        .arg("sideways")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown deletion mode"));
}

// ============================================================================
// init command tests
// ============================================================================

#[test]
fn test_init_writes_starter_manifest() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let out = dir.path().join("starter.yml");

    gve()
        .arg("init")
        .arg(fixture_path("customers_valid.json"))
        .arg("--output")
        .arg(out.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("Manifest written to"));

    let written = fs::read_to_string(&out).expect("Manifest file missing");
    assert!(written.contains("name: customers_valid"));
    assert!(written.contains("Email"));
    assert!(written.contains("required"));
}

#[test]
fn test_init_prints_to_stdout_by_default() {
    gve()
        .arg("init")
        .arg(fixture_path("customers_valid.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("version:"))
        .stdout(predicate::str::contains("Age"));
}

#[test]
fn test_init_manifest_round_trips_through_check() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let out = dir.path().join("starter.yml");

    gve()
        .arg("init")
        .arg(fixture_path("customers_valid.json"))
        .arg("--output")
        .arg(out.to_str().unwrap())
        .assert()
        .success();

    gve()
        .arg("check")
        .arg(out.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("Manifest is valid"));
}
