//! Integration tests for the CLI interface

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn fintransform() -> Command {
    let mut cmd = Command::cargo_bin("fintransform").unwrap();
    cmd.env_remove("FINTRANSFORM_MAX_PARALLEL_MAPPERS")
        .env_remove("FINTRANSFORM_MAX_PARALLEL_REDUCERS")
        .env_remove("FINTRANSFORM_AMOUNT_POLICY");
    cmd
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

const SAMPLE: &str = r#"[
    {"transId": "EXT001", "amount": 100.5},
    {"transId": "EXT002", "amount": 200.0},
    {"transId": null, "amount": 300.0}
]"#;

#[test]
fn test_cli_help_flag() {
    fintransform()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_run_prints_summary_line() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "records.json", SAMPLE);

    fintransform()
        .arg("run")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total processed: 2"));
}

#[test]
fn test_run_writes_output_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "records.json", SAMPLE);
    let output = temp_dir.path().join("out.jsonl");

    fintransform()
        .arg("run")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written.lines().count(), 2);
    assert!(written.contains("custrecord_ext_trans_id"));
}

#[test]
fn test_run_uses_configured_label() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "records.json", SAMPLE);
    let config = write_file(
        &temp_dir,
        "fintransform.toml",
        "[labels.myTranslations]\nTOTAL_PROCESSED = \"Records handled\"\n",
    );

    fintransform()
        .arg("run")
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Records handled: 2"));
}

#[test]
fn test_run_amount_policy_flag() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(
        &temp_dir,
        "records.json",
        r#"[{"transId": "A", "amount": 0}, {"transId": "B", "amount": 1}]"#,
    );

    fintransform()
        .args(["run", "--amount-policy", "non-zero"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total processed: 1"));
}

#[test]
fn test_run_malformed_input_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "records.jsonl", "{\"transId\":\"A\",\"amount\":1}\nnot json\n");

    fintransform()
        .arg("run")
        .arg(&input)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stdout(predicate::str::contains("Total processed").not());
}

#[test]
fn test_run_missing_input_fails() {
    let temp_dir = TempDir::new().unwrap();

    fintransform()
        .arg("run")
        .arg(temp_dir.path().join("missing.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Source unavailable"));
}

#[test]
fn test_run_rejects_zero_parallelism() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "records.json", SAMPLE);

    fintransform()
        .args(["run", "--max-parallel", "0"])
        .arg(&input)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max_parallel_mappers"));
}

#[test]
fn test_check_reports_without_persisting() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "records.json", SAMPLE);

    fintransform()
        .arg("check")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Units read: 3"))
        .stdout(predicate::str::contains("Would persist: 2"))
        .stdout(predicate::str::contains("Rejected: 1"))
        .stdout(predicate::str::contains("Distinct keys: 2"));
}

#[test]
fn test_invalid_amount_policy_is_rejected() {
    fintransform()
        .args(["check", "records.json", "--amount-policy", "sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown amount policy"));
}
