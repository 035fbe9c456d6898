use assert_cmd::prelude::*;
use serde_json::Value;
use std::process::Command;

const OVERRIDE_VARS: [&str; 2] = [
    "RAPIDTAP_POLICY_CLI_OVERRIDES",
    "RAPIDTAP_POLICY_OVERRIDE_JSON",
];

fn rapidtap() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rapidtap"));
    for var in OVERRIDE_VARS {
        cmd.env_remove(var);
    }
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let assert = cmd.assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn patterns_lists_builtin_catalogue() {
    let assert = rapidtap().arg("patterns").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("buy_now"));
    assert!(stdout.contains("Place Order"));
    assert!(stdout.contains("(critical)"));
}

#[test]
fn config_reflects_policy_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.yaml");
    std::fs::write(
        &path,
        "host:\n  package: com.example.shop\ncache:\n  ttl_ms: 900\n",
    )
    .unwrap();

    let value = stdout_json(rapidtap().args([
        "--config",
        path.to_str().unwrap(),
        "--output",
        "json",
        "config",
    ]));
    assert_eq!(value["host"]["package"], "com.example.shop");
    assert_eq!(value["cache"]["ttl_ms"], 900);
    assert_eq!(value["patterns"].as_array().unwrap().len(), 6);
    assert!(value.get("provenance").is_none());

    let sources = stdout_json(rapidtap().args([
        "--config",
        path.to_str().unwrap(),
        "--output",
        "json",
        "config",
        "--provenance",
    ]));
    assert_eq!(sources["cache.ttl_ms"], "file");
    assert_eq!(sources["host.min_event_interval_ms"], "builtin");
}

#[test]
fn missing_policy_file_is_an_error() {
    rapidtap()
        .args(["--config", "/nonexistent/rapidtap.yaml", "config"])
        .assert()
        .failure();
}

#[test]
fn simulate_reports_every_signal() {
    let value = stdout_json(rapidtap().args([
        "--output",
        "json",
        "simulate",
        "--scene",
        "tests/fixtures/checkout_scene.yaml",
        "--cycles",
        "4",
        "--interval-ms",
        "80",
    ]));
    assert_eq!(value["cycles"].as_array().unwrap().len(), 4);
    assert_eq!(value["stats"]["received"], 4);
    assert_eq!(value["cycles"][1]["screen"], "loading");
    let taps: Vec<&str> = value["accepted_taps"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(taps.contains(&"Buy Now"));
}

#[test]
fn simulate_through_intake_worker() {
    let value = stdout_json(rapidtap().args([
        "--output",
        "json",
        "simulate",
        "--scene",
        "tests/fixtures/checkout_scene.yaml",
        "--cycles",
        "4",
        "--interval-ms",
        "80",
        "--background",
    ]));
    let cycles = value["cycles"].as_array().unwrap();
    assert_eq!(cycles.len(), 4);
    assert!(cycles.iter().all(|cycle| cycle["outcome"] == "completed"));
    assert_eq!(value["stats"]["admitted"], 4);
    assert_eq!(value["stats"]["cycles_completed"], 4);
}

#[test]
fn info_prints_build_metadata() {
    let assert = rapidtap().arg("info").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("RapidTap System Information"));
    assert!(stdout.contains("Git Commit:"));
}
