//! CLI integration tests
//!
//! Run the `rtk` binary against report files written to a scratch directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

fn report(cpu_percent: f64, timestamp: &str, token: &str) -> Value {
    json!({
        "header": {
            "dumpEventTimestamp": timestamp,
            "processId": 4242,
            "cpus": [{"model": "x"}, {"model": "x"}],
            "componentVersions": {"node": "12.11.1", "openssl": "1.1.1c"}
        },
        "environmentVariables": {"HOME": "/root", "NPM_TOKEN": token},
        "resourceUsage": {"cpuConsumptionPercent": cpu_percent},
        "sharedObjects": ["/lib/x86_64-linux-gnu/libdl.so.2"]
    })
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn rtk(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rtk"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_diff_text_output_redacts_by_default() {
    let temp = TempDir::new().unwrap();
    write_json(temp.path(), "a.json", &report(25.0, "1", "secret-a"));
    write_json(temp.path(), "b.json", &report(30.0, "1", "secret-b"));

    let output = rtk(temp.path(), &["diff", "a.json", "b.json"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("[replace] <resourceUsage.cpuConsumptionPercent> 25.0 => 30.0"), "{}", text);
    assert!(!text.contains("secret-a"));
    assert!(!text.contains("NPM_TOKEN"));
}

#[test]
fn test_diff_json_with_filter_and_unsafe_secrets() {
    let temp = TempDir::new().unwrap();
    write_json(temp.path(), "a.json", &report(25.0, "1", "secret-a"));
    write_json(temp.path(), "b.json", &report(30.0, "2", "secret-b"));

    let output = rtk(
        temp.path(),
        &[
            "diff",
            "a.json",
            "b.json",
            "--filter",
            "dumpEventTimestamp,resourceUsage",
            "--format",
            "json",
            "--show-secrets-unsafe",
        ],
    );
    assert!(output.status.success());
    let results: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        results,
        json!([{
            "op": "replace",
            "path": "environmentVariables.NPM_TOKEN",
            "oldValue": "secret-a",
            "newValue": "secret-b"
        }])
    );
}

#[test]
fn test_inspect_json_messages() {
    let temp = TempDir::new().unwrap();
    write_json(temp.path(), "a.json", &report(25.0, "1", "t"));

    let output = rtk(temp.path(), &["inspect", "a.json", "--format", "json"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let messages: Value = serde_json::from_slice(&output.stdout).unwrap();
    let cpu = &messages[0];
    assert_eq!(cpu["ruleId"], json!("cpu-usage"));
    assert_eq!(cpu["severity"], json!("info"));
    assert_eq!(cpu["data"]["usage"], json!(12.5));
    assert_eq!(cpu["filename"], json!("a.json"));
}

#[test]
fn test_inspect_severity_and_config_file() {
    let temp = TempDir::new().unwrap();
    write_json(temp.path(), "a.json", &report(25.0, "1", "t"));
    fs::write(
        temp.path().join("rtkrc.yaml"),
        "rules:\n  cpu-usage:\n    max: 10\n",
    )
    .unwrap();

    let output = rtk(
        temp.path(),
        &["--config", "rtkrc.yaml", "inspect", "a.json", "--severity", "error"],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 1, "{}", text);
    assert!(lines[0].starts_with("error: [cpu-usage] Mean CPU consumption percent (12.5%) is outside"));
}

#[test]
fn test_inspect_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let output = rtk(temp.path(), &["inspect", "nope.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_IO"));
}

#[test]
fn test_transform_csv_header_once() {
    let temp = TempDir::new().unwrap();
    write_json(temp.path(), "a.json", &report(25.0, "1", "t"));
    write_json(temp.path(), "b.json", &report(30.0, "2", "t"));

    let output = rtk(
        temp.path(),
        &[
            "transform",
            "a.json",
            "b.json",
            "-t",
            "filter,csv",
            "-o",
            "filter.include=\"resourceUsage\"",
        ],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout(&output),
        "resourceUsage.cpuConsumptionPercent\n25.0\n30.0\n"
    );
}

#[test]
fn test_transform_type_mismatch_fails_before_output() {
    let temp = TempDir::new().unwrap();
    write_json(temp.path(), "a.json", &report(25.0, "1", "t"));

    let output = rtk(temp.path(), &["transform", "a.json", "-t", "json,filter"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_CHAIN_TYPE_MISMATCH"));
}

#[test]
fn test_list_rules_and_transformers() {
    let temp = TempDir::new().unwrap();

    let rules = rtk(temp.path(), &["list-rules", "--format", "json"]);
    assert!(rules.status.success());
    let rules: Value = serde_json::from_slice(&rules.stdout).unwrap();
    let ids: Vec<_> = rules
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["cpu-usage", "library-mismatch"]);

    let transformers = rtk(temp.path(), &["list-transformers"]);
    assert!(transformers.status.success());
    let text = stdout(&transformers);
    assert!(text.lines().any(|l| l.starts_with("stack-hash")));
    assert_eq!(text.lines().count(), 7);
}
