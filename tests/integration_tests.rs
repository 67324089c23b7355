//! Integration tests for the elca CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get an elca command with a clean environment
fn elca() -> Command {
    let mut cmd = Command::cargo_bin("elca").unwrap();
    cmd.env_remove("ELCA_FORMAT")
        .env_remove("ELCA_AUTO_UPDATE")
        .env_remove("ELCA_LOG");
    cmd
}

/// Helper to create an example workspace in a temp directory
fn setup_example() -> TempDir {
    let tmp = TempDir::new().unwrap();
    elca()
        .current_dir(tmp.path())
        .args(["init", "--example"])
        .assert()
        .success();
    tmp
}

/// Helper to create an example workspace with computed results
fn setup_computed() -> TempDir {
    let tmp = setup_example();
    elca().current_dir(tmp.path()).arg("compute").assert().success();
    tmp
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    elca()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Computes LCA results of building variants"))
        .stdout(predicate::str::contains("compute"))
        .stdout(predicate::str::contains("results"));
}

#[test]
fn test_short_help_uses_about() {
    elca()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Life cycle assessment of building models"));
}

#[test]
fn test_version_displays() {
    elca()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("elca"));
}

#[test]
fn test_completions_bash() {
    elca()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("elca"));
}

// ============================================================================
// Init
// ============================================================================

#[test]
fn test_init_creates_workspace() {
    let tmp = TempDir::new().unwrap();
    elca()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized workspace"));

    assert!(tmp.path().join(".elca").is_dir());
    assert!(tmp.path().join(".elca/config.yaml").is_file());
    assert!(tmp.path().join("library").is_dir());
    assert!(tmp.path().join("variants").is_dir());
}

#[test]
fn test_init_twice_requires_force() {
    let tmp = TempDir::new().unwrap();
    elca().current_dir(tmp.path()).arg("init").assert().success();

    elca()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    elca()
        .current_dir(tmp.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_init_example_writes_model_files() {
    let tmp = setup_example();
    assert!(tmp.path().join("library/library.elca.yaml").is_file());
    assert!(tmp.path().join("variants/v1.elca.yaml").is_file());
}

#[test]
fn test_commands_outside_workspace_fail() {
    let tmp = TempDir::new().unwrap();
    elca()
        .current_dir(tmp.path())
        .args(["results", "total"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("elca init"));
}

// ============================================================================
// Validate
// ============================================================================

#[test]
fn test_validate_example() {
    let tmp = setup_example();
    elca()
        .current_dir(tmp.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Model is valid"));
}

#[test]
fn test_validate_reports_unknown_process_config() {
    let tmp = setup_example();
    let path = tmp.path().join("variants/v1.elca.yaml");
    let content = fs::read_to_string(&path)
        .unwrap()
        .replace("process_config: truck", "process_config: ship");
    fs::write(&path, content).unwrap();

    elca()
        .current_dir(tmp.path())
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("unknown process_config 'ship'"));
}

#[test]
fn test_validate_reports_yaml_errors() {
    let tmp = setup_example();
    fs::write(
        tmp.path().join("variants/broken.elca.yaml"),
        "kind: variant\nid: [unclosed\n",
    )
    .unwrap();

    elca()
        .current_dir(tmp.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid model file"));
}

#[test]
fn test_compute_refuses_invalid_model() {
    let tmp = setup_example();
    let path = tmp.path().join("variants/v1.elca.yaml");
    let content = fs::read_to_string(&path)
        .unwrap()
        .replace("process_config: gas", "process_config: oil");
    fs::write(&path, content).unwrap();

    elca()
        .current_dir(tmp.path())
        .arg("compute")
        .assert()
        .failure()
        .stderr(predicate::str::contains("elca validate"));
}

// ============================================================================
// Compute and results
// ============================================================================

#[test]
fn test_compute_reports_variants() {
    let tmp = setup_example();
    elca()
        .current_dir(tmp.path())
        .arg("compute")
        .assert()
        .success()
        .stdout(predicate::str::contains("v1"))
        .stdout(predicate::str::contains("2 element(s)"));

    assert!(tmp.path().join(".elca/cache.db").is_file());
}

#[test]
fn test_results_total() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .args(["results", "total"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gwp"))
        .stdout(predicate::str::contains("70140.00"));
}

#[test]
fn test_results_total_json() {
    let tmp = setup_computed();
    let output = elca()
        .current_dir(tmp.path())
        .args(["results", "total", "--variant", "v1", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let totals: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let gwp = totals
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["indicator"] == "gwp")
        .unwrap();
    assert!((gwp["value"].as_f64().unwrap() - 70140.0).abs() < 1e-6);
}

#[test]
fn test_results_phases_csv() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .args(["results", "phases", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("life_cycle,kind,gwp"))
        .stdout(predicate::str::contains("B6"));
}

#[test]
fn test_results_element() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .args(["results", "element", "wall"])
        .assert()
        .success()
        .stdout(predicate::str::contains("7160.00"))
        .stdout(predicate::str::contains("wall-concrete"));
}

#[test]
fn test_results_unknown_element() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .args(["results", "element", "roof"])
        .assert()
        .failure();
}

#[test]
fn test_results_energy_and_transports() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .args(["results", "energy", "-i", "gwp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("62500.00"))
        .stdout(predicate::str::contains("-25000.00"));

    elca()
        .current_dir(tmp.path())
        .args(["results", "transports"])
        .assert()
        .success()
        .stdout(predicate::str::contains("delivery-truck"))
        .stdout(predicate::str::contains("480.00"));
}

#[test]
fn test_results_top_and_element_types() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .args(["results", "top", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wall"));

    elca()
        .current_dir(tmp.path())
        .args(["results", "element-types", "--level", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("331"))
        .stdout(predicate::str::contains("Exterior walls"));
}

#[test]
fn test_results_compare_variants() {
    let tmp = setup_example();
    let v1 = fs::read_to_string(tmp.path().join("variants/v1.elca.yaml")).unwrap();
    let v2 = v1.replace("id: v1", "id: v2").replace("heating: 50", "heating: 40");
    fs::write(tmp.path().join("variants/v2.elca.yaml"), v2).unwrap();
    elca().current_dir(tmp.path()).arg("compute").assert().success();

    elca()
        .current_dir(tmp.path())
        .args(["results", "compare", "--variant", "v1", "--variant", "v2", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("indicator,unit,v1,v2,difference,change_%"))
        .stdout(predicate::str::contains("gwp,kg CO2 equiv.,70140.00,57640.00,-12500.00,-17.82"));

    elca()
        .current_dir(tmp.path())
        .args(["results", "compare", "--variant", "v1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exactly two variants"));
}

#[test]
fn test_results_savings_of_extant_components() {
    let tmp = setup_example();
    let path = tmp.path().join("variants/v1.elca.yaml");
    let content = fs::read_to_string(&path)
        .unwrap()
        .replace("life_time: 80 }", "life_time: 80, extant: true }");
    fs::write(&path, content).unwrap();

    elca()
        .current_dir(tmp.path())
        .args(["results", "savings"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 extant component(s)"))
        .stdout(predicate::str::contains("6000.00"))
        .stdout(predicate::str::contains("1.20"));
}

#[test]
fn test_results_without_compute() {
    let tmp = setup_example();
    elca()
        .current_dir(tmp.path())
        .args(["results", "total"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("elca compute"));
}

// ============================================================================
// Status and incremental compute
// ============================================================================

#[test]
fn test_status_tracks_changes() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));

    let path = tmp.path().join("variants/v1.elca.yaml");
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("# edited\n");
    fs::write(&path, content).unwrap();

    elca()
        .current_dir(tmp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("stale"));
}

#[test]
fn test_compute_changed_skips_unchanged_variants() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .args(["compute", "--changed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to compute"));
}

#[test]
fn test_compute_removes_deleted_variants() {
    let tmp = setup_computed();
    fs::remove_file(tmp.path().join("variants/v1.elca.yaml")).unwrap();

    elca()
        .current_dir(tmp.path())
        .arg("compute")
        .assert()
        .success()
        .stdout(predicate::str::contains("removed from cache"));
}

#[test]
fn test_update_without_outdated_items() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));
}

#[test]
fn test_update_csv_output() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .args(["update", "-f", "csv"])
        .assert()
        .success()
        .stdout("project,outdated_items,items_updated,duration_ms\noffice,0,0,0\n");
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn test_cache_status() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .args(["cache", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache Status"))
        .stdout(predicate::str::contains("element_component"));
}

#[test]
fn test_cache_check_passes() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .args(["cache", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues found"));
}

#[test]
fn test_cache_query() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .args(["cache", "query", "SELECT COUNT(*) AS n FROM project_variants"])
        .assert()
        .success()
        .stdout("n\n1\n");
}

#[test]
fn test_cache_query_rejects_writes() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .args(["cache", "query", "DELETE FROM items"])
        .assert()
        .failure();
}

#[test]
fn test_cache_clear() {
    let tmp = setup_computed();
    elca()
        .current_dir(tmp.path())
        .args(["cache", "clear", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache cleared"));

    elca()
        .current_dir(tmp.path())
        .args(["results", "total"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no cached results"));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_show_reads_workspace_config() {
    let tmp = setup_example();
    fs::write(tmp.path().join(".elca/config.yaml"), "default_format: json\n").unwrap();

    elca()
        .current_dir(tmp.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_format: json"));
}

#[test]
fn test_configured_default_format() {
    let tmp = setup_computed();
    fs::write(tmp.path().join(".elca/config.yaml"), "default_format: json\n").unwrap();

    let output = elca()
        .current_dir(tmp.path())
        .args(["results", "total"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(parsed.is_array());
}
