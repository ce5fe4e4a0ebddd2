//! End-to-end tests for the fundeb binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

const EXTRACTORS_YAML: &str = r#"
conta_corrente:
  csv:
    params:
      sep: ";"
      decimal: ","
      thousands: "."
"#;

/// Source tree with one valid and one malformed statement plus a config
/// file pointing at it. Returns the config path.
fn workspace(dir: &Path) -> std::path::PathBuf {
    let module_dir = dir.join("raw").join("conta_corrente");
    fs::create_dir_all(&module_dir).unwrap();
    fs::write(
        module_dir.join("EXTRATO_BANCARIO_CC_2025_01.csv"),
        "data;historico;valor\n2025-01-02;TRANSF FUNDEB;1.234,56\n2025-01-03;TARIFA;-12,00\n",
    )
    .unwrap();
    fs::write(
        module_dir.join("EXTRATO_BANCARIO_CC_2025_02.csv"),
        "data;valor\n2025-02-01;1,00;extra\n",
    )
    .unwrap();

    let extractors = dir.join("extractors.yaml");
    fs::write(&extractors, EXTRACTORS_YAML).unwrap();

    let config = json!({
        "paths": {
            "source_dir": dir.join("raw"),
            "staging_dir": dir.join("bronze"),
            "extractors_config": extractors,
        },
        "discovery": [
            {"module": "conta_corrente", "pattern": "EXTRATO_BANCARIO_CC*.csv"}
        ]
    });
    let config_path = dir.join("fundeb.json");
    fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    config_path
}

fn fundeb(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("fundeb").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"));
    cmd
}

#[test]
fn test_run_stages_valid_files_and_reports_failures() {
    let dir = TempDir::new().unwrap();
    let config = workspace(dir.path());

    fundeb(&dir)
        .arg("-c")
        .arg(&config)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 files"))
        .stdout(predicate::str::contains("Succeeded: 1"))
        .stdout(predicate::str::contains("Failed:    1"))
        .stdout(predicate::str::contains("[extraction]"));

    assert!(dir
        .path()
        .join("bronze")
        .join("conta_corrente_EXTRATO_BANCARIO_CC_2025_01.parquet")
        .is_file());
    assert!(!dir
        .path()
        .join("bronze")
        .join("conta_corrente_EXTRATO_BANCARIO_CC_2025_02.parquet")
        .exists());
}

#[test]
fn test_run_with_jobs() {
    let dir = TempDir::new().unwrap();
    let config = workspace(dir.path());

    fundeb(&dir)
        .arg("-c")
        .arg(&config)
        .args(["run", "--jobs", "2", "--skip-transform"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Succeeded: 1"));
}

#[test]
fn test_run_fails_without_handler_config() {
    let dir = TempDir::new().unwrap();
    let config = workspace(dir.path());
    fs::remove_file(dir.path().join("extractors.yaml")).unwrap();

    fundeb(&dir)
        .arg("-c")
        .arg(&config)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn test_extract_single_file() {
    let dir = TempDir::new().unwrap();
    let config = workspace(dir.path());
    let out = dir.path().join("out");

    fundeb(&dir)
        .arg("-c")
        .arg(&config)
        .arg("extract")
        .arg("conta_corrente")
        .arg(
            dir.path()
                .join("raw/conta_corrente/EXTRATO_BANCARIO_CC_2025_01.csv"),
        )
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Staged 2 rows"));

    assert!(out
        .join("conta_corrente_EXTRATO_BANCARIO_CC_2025_01.parquet")
        .is_file());
}

#[test]
fn test_extract_unknown_module_fails() {
    let dir = TempDir::new().unwrap();
    let config = workspace(dir.path());

    fundeb(&dir)
        .arg("-c")
        .arg(&config)
        .arg("extract")
        .arg("modulo_fantasma")
        .arg(
            dir.path()
                .join("raw/conta_corrente/EXTRATO_BANCARIO_CC_2025_01.csv"),
        )
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration failure"));
}

#[test]
fn test_discover_lists_files() {
    let dir = TempDir::new().unwrap();
    let config = workspace(dir.path());

    fundeb(&dir)
        .arg("-c")
        .arg(&config)
        .arg("discover")
        .assert()
        .success()
        .stdout(predicate::str::contains("EXTRATO_BANCARIO_CC_2025_01.csv"))
        .stdout(predicate::str::contains("EXTRATO_BANCARIO_CC_2025_02.csv"))
        .stdout(predicate::str::contains("2 files"));
}

#[test]
fn test_config_init_and_get() {
    let home = TempDir::new().unwrap();
    let output = home.path().join("fundeb.json");

    fundeb(&home)
        .args(["config", "init", "--output"])
        .arg(&output)
        .assert()
        .success();
    assert!(output.is_file());

    fundeb(&home)
        .args(["config", "init", "--output"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    fundeb(&home)
        .arg("-c")
        .arg(&output)
        .args(["config", "get", "paths.staging_dir"])
        .assert()
        .success()
        .stdout(predicate::str::contains("data/bronze"));

    fundeb(&home)
        .arg("-c")
        .arg(&output)
        .args(["config", "get", "discovery.0.module"])
        .assert()
        .success()
        .stdout(predicate::str::contains("conta_corrente"));

    fundeb(&home)
        .arg("-c")
        .arg(&output)
        .args(["config", "get", "paths.nope"])
        .assert()
        .failure();
}

#[test]
fn test_config_path_and_show_defaults() {
    let home = TempDir::new().unwrap();

    fundeb(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.json"))
        .stdout(predicate::str::contains("not created"));

    fundeb(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"extractors_config\""));
}
