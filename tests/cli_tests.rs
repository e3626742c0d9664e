//! CLI command tests

mod common;

use common::{euvsim, setup_small_recipe, write_recipe};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    euvsim()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("stochastic EUV"));
}

#[test]
fn test_version_displays() {
    euvsim()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("euvsim"));
}

#[test]
fn test_unknown_command_fails() {
    euvsim()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_completions_bash() {
    euvsim()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("euvsim"));
}

// ============================================================================
// Init Command Tests
// ============================================================================

#[test]
fn test_init_writes_valid_recipe() {
    let tmp = TempDir::new().unwrap();

    euvsim()
        .current_dir(tmp.path())
        .args(["init", "line16.yaml", "--size-px", "64"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created recipe"));

    let content = fs::read_to_string(tmp.path().join("line16.yaml")).unwrap();
    assert!(content.contains("name: \"line16\""));
    assert!(content.contains("type: line-space"));

    euvsim()
        .current_dir(tmp.path())
        .args(["validate", "line16.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All recipes passed validation"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let tmp = TempDir::new().unwrap();
    euvsim()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success();

    euvsim()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    euvsim()
        .current_dir(tmp.path())
        .args(["init", "--force", "--resist", "meox", "--high-na"])
        .assert()
        .success();
    let content = fs::read_to_string(tmp.path().join("recipe.yaml")).unwrap();
    assert!(content.contains("metal-oxide"));
}

// ============================================================================
// Validate Command Tests
// ============================================================================

#[test]
fn test_validate_reports_out_of_range_field() {
    let tmp = TempDir::new().unwrap();
    write_recipe(&tmp, "bad.yaml", "tool:\n  numerical_aperture: 1.4\n");

    euvsim()
        .current_dir(tmp.path())
        .args(["validate", "bad.yaml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("numerical_aperture"))
        .stderr(predicate::str::contains("Validation failed"));
}

#[test]
fn test_validate_directory_keep_going() {
    let tmp = TempDir::new().unwrap();
    write_recipe(&tmp, "a.yaml", "name: a\n");
    write_recipe(&tmp, "b.yaml", "name: b\nbogus: 1\n");
    write_recipe(&tmp, "c.yaml", "name: c\n");

    euvsim()
        .args(["validate", "--keep-going"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Files checked:  3"))
        .stdout(predicate::str::contains("Files passed:   2"));
}

#[test]
fn test_validate_missing_file_fails() {
    euvsim()
        .args(["validate", "does-not-exist.yaml"])
        .assert()
        .failure();
}

// ============================================================================
// Run Command Tests
// ============================================================================

#[test]
fn test_run_text_report() {
    let (_tmp, path) = setup_small_recipe();
    euvsim()
        .arg("run")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("CD:"))
        .stdout(predicate::str::contains("LER (3σ):"))
        .stdout(predicate::str::contains("Defects:"));
}

#[test]
fn test_run_json_is_deterministic() {
    let (_tmp, path) = setup_small_recipe();
    let run = || {
        let output = euvsim()
            .args(["-o", "json", "run"])
            .arg(&path)
            .output()
            .unwrap();
        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        value
    };
    let a = run();
    let b = run();
    assert_eq!(a["metrics"], b["metrics"]);
    assert_eq!(a["seed"], 7);
    assert_eq!(a["recipe"], "small");
    assert!(a["metrics"]["cd_error_nm"].as_f64().unwrap().abs() < 2.0);
}

#[test]
fn test_run_overrides_and_stats() {
    let (_tmp, path) = setup_small_recipe();
    let output = euvsim()
        .args(["-o", "json", "run", "--dose", "28", "--focus", "-10", "--seed", "3", "--stats"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["dose_mj_cm2"], 28.0);
    assert_eq!(value["focus_nm"], -10.0);
    assert_eq!(value["seed"], 3);
    assert!(value["photon_statistics"]["total_photons"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_run_plot() {
    let (_tmp, path) = setup_small_recipe();
    euvsim()
        .args(["run", "--plot"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Latent image cross-section"));
}

#[test]
fn test_run_rejects_bad_override() {
    let (_tmp, path) = setup_small_recipe();
    euvsim()
        .args(["run", "--na", "1.5"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("numerical_aperture"));
}

#[test]
fn test_run_uniform_mask_is_insufficient() {
    let tmp = TempDir::new().unwrap();
    let path = write_recipe(
        &tmp,
        "blank.yaml",
        "name: blank\nmask:\n  type: ascii\n  art: |\n    ........\n    ........\n    ........\n",
    );
    euvsim().arg("run").arg(&path).assert().failure();
}

// ============================================================================
// Sweep Command Tests
// ============================================================================

#[test]
fn test_sweep_table_and_summary() {
    let (_tmp, path) = setup_small_recipe();
    euvsim()
        .args(["sweep", "--map"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("DOSE"))
        .stdout(predicate::str::contains("Process window"))
        .stdout(predicate::str::contains("Depth of focus"));
}

#[test]
fn test_sweep_csv_stdout() {
    let (_tmp, path) = setup_small_recipe();
    let output = euvsim()
        .args(["-o", "csv", "sweep"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "dose,focus,cd_error,ler,defects,pass");
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("26.0,-20.0,"));
}

#[test]
fn test_sweep_overrides_and_csv_file() {
    let (tmp, path) = setup_small_recipe();
    let csv_path = tmp.path().join("window.csv");
    let output = euvsim()
        .args([
            "-o",
            "json",
            "sweep",
            "--dose-range",
            "28,32",
            "--focus-range",
            "-10:10",
            "-n",
            "3",
            "-j",
            "2",
            "--csv",
        ])
        .arg(&csv_path)
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["dose"].as_array().unwrap().len(), 9);
    assert_eq!(value["grid_resolution"], 3);
    let window = value["process_window_size"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&window));

    let csv = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 10);
}

#[test]
fn test_sweep_rejects_empty_grid() {
    let (_tmp, path) = setup_small_recipe();
    euvsim()
        .args(["sweep", "-n", "0"])
        .arg(&path)
        .assert()
        .failure();
}
