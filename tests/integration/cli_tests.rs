//! CLI integration tests
//!
//! These tests verify that the CLI works correctly with various options.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get the path to the test fixtures directory
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn program_path() -> String {
    fixtures_path().join("program.json").to_string_lossy().to_string()
}

fn apk_path() -> String {
    fixtures_path().join("apk").to_string_lossy().to_string()
}

fn keepgraph() -> Command {
    let mut cmd = Command::cargo_bin("keepgraph").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

fn json_report(args: &[&str]) -> serde_json::Value {
    let output = keepgraph()
        .args(args)
        .args(["--format", "json", "--quiet"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

fn entity<'a>(report: &'a serde_json::Value, name: &str) -> Option<&'a serde_json::Value> {
    report["entities"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["name"] == name)
}

fn reason_kinds(entity: &serde_json::Value) -> Vec<&str> {
    entity["keep_reasons"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["kind"].as_str())
        .collect()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_help() {
    keepgraph()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--apk-dir"))
        .stdout(predicate::str::contains("--explain"));
}

#[test]
fn test_version() {
    keepgraph()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_program_fails() {
    keepgraph()
        .arg(fixtures_path().join("does-not-exist.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read program dump"));
}

#[test]
fn test_unknown_prune_kind_is_rejected() {
    keepgraph()
        .args([program_path().as_str(), "--prune-unexported", "widget"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown component kind"));
}

// ============================================================================
// Reports
// ============================================================================

#[test]
fn test_terminal_report() {
    keepgraph()
        .args([program_path().as_str(), "--apk-dir", apk_path().as_str(), "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Kept by manifest"))
        .stdout(predicate::str::contains("Lcom/example/app/MainActivity;"))
        .stdout(predicate::str::contains("Kept by resource xml"))
        .stdout(predicate::str::contains("Lcom/example/app/Dead;").not());
}

#[test]
fn test_json_report_with_apk() {
    let report = json_report(&[program_path().as_str(), "--apk-dir", apk_path().as_str()]);

    let main = entity(&report, "Lcom/example/app/MainActivity;").unwrap();
    assert!(reason_kinds(main).contains(&"manifest"));

    let chart = entity(&report, "Lcom/example/app/widget/ChartView;").unwrap();
    assert_eq!(chart["by_resources"], true);

    let bridge = entity(&report, "Lcom/example/app/NativeBridge;").unwrap();
    assert!(reason_kinds(bridge).contains(&"native library"));

    let plugin = entity(&report, "Lcom/example/app/plugin/Plugin;.create:()V").unwrap();
    assert_eq!(
        plugin["keep_reasons"][0]["triggered_by"],
        "Lcom/example/app/Reflector;.lookup:()V"
    );

    assert!(entity(&report, "Lcom/example/app/Dead;").is_none());
}

#[test]
fn test_json_report_without_apk() {
    let report = json_report(&[program_path().as_str()]);

    assert!(entity(&report, "Lcom/example/app/MainActivity;").is_none());
    assert!(entity(&report, "Lcom/example/app/model/Base;.<init>:()V").is_some());
}

#[test]
fn test_prune_unexported_activity() {
    let report = json_report(&[
        program_path().as_str(),
        "--apk-dir",
        apk_path().as_str(),
        "--prune-unexported",
        "activity",
    ]);

    let settings = entity(&report, "Lcom/example/app/SettingsActivity;").unwrap();
    assert!(reason_kinds(settings).is_empty());
    assert_eq!(settings["keep_count"], 1);
    assert_eq!(settings["allow_obfuscation"], false);

    let main = entity(&report, "Lcom/example/app/MainActivity;").unwrap();
    assert!(reason_kinds(main).contains(&"manifest"));
}

#[test]
fn test_switches_disable_resource_oracles() {
    let report = json_report(&[
        program_path().as_str(),
        "--apk-dir",
        apk_path().as_str(),
        "--no-xml",
        "--no-native-libs",
    ]);

    assert!(entity(&report, "Lcom/example/app/MainActivity;").is_none());
    assert!(entity(&report, "Lcom/example/app/widget/ChartView;").is_none());
    assert!(entity(&report, "Lcom/example/app/NativeBridge;").is_none());
}

#[test]
fn test_keep_package_flag() {
    let report = json_report(&[program_path().as_str(), "--keep-package", "Lcom/example/app/Dead;"]);

    let dead = entity(&report, "Lcom/example/app/Dead;").unwrap();
    assert_eq!(dead["by_string"], true);
}

#[test]
fn test_explain_filter() {
    let report = json_report(&[
        program_path().as_str(),
        "--apk-dir",
        apk_path().as_str(),
        "--explain",
        "ChartView",
    ]);

    let names: Vec<&str> = report["entities"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["name"].as_str())
        .collect();
    assert!(!names.is_empty());
    assert!(names.iter().all(|n| n.contains("ChartView")));
}

#[test]
fn test_json_output_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("keep.json");

    keepgraph()
        .args([program_path().as_str(), "--format", "json", "--quiet", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Report written to"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert!(report["total_reachable"].as_u64().unwrap() > 0);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_file_is_applied() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("keep.yml");
    std::fs::write(
        &config,
        format!("apk_dir: {}\nkeep_methods: [helper]\n", apk_path()),
    )
    .unwrap();

    let report = json_report(&[
        program_path().as_str(),
        "--config",
        config.to_string_lossy().as_ref(),
    ]);

    assert!(entity(&report, "Lcom/example/app/MainActivity;").is_some());
    let helper = entity(&report, "Lcom/example/app/Dead;.helper:()V").unwrap();
    assert!(reason_kinds(helper).contains(&"explicit list"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("keep.yml");
    std::fs::write(&config, "prune_unexported_components: [widget]\n").unwrap();

    keepgraph()
        .args([program_path().as_str(), "--config"])
        .arg(&config)
        .assert()
        .failure();
}

#[test]
fn test_watch_requires_apk_dir() {
    keepgraph()
        .args([program_path().as_str(), "--watch", "--quiet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--watch needs an apk directory"));
}
