//! End-to-end tests of the `lintbridge` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn lintbridge() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lintbridge"))
}

fn frame(body: &str) -> String {
    format!("Content-Length: {}\r\n\r\n{body}", body.len())
}

#[test]
fn test_version() {
    lintbridge()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("lintbridge "));
}

#[test]
fn test_config_prints_effective_yaml() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("config.yaml");
    fs::write(
        &config,
        r#"version: 2
lint-debounce: 300ms
languages:
  vim:
    - lint-command: "vint -"
      lint-stdin: true
"#,
    )
    .unwrap();

    lintbridge()
        .arg("config")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("lint-command: vint -"))
        .stdout(predicate::str::contains("lint-stdin: true"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let temp = tempfile::tempdir().unwrap();

    lintbridge()
        .arg("config")
        .arg("--config")
        .arg(temp.path().join("nope.yaml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_invalid_config_fails() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("config.yaml");
    fs::write(&config, "languages: [not, a, map]\n").unwrap();

    lintbridge()
        .arg("config")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Config error"));
}

#[test]
fn test_stdio_session() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("config.yaml");
    fs::write(&config, "version: 2\n").unwrap();

    let input = [
        frame(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"capabilities":{}}}"#),
        frame(r#"{"jsonrpc":"2.0","method":"initialized","params":{}}"#),
        frame(r#"{"jsonrpc":"2.0","id":2,"method":"shutdown"}"#),
        frame(r#"{"jsonrpc":"2.0","method":"exit"}"#),
    ]
    .concat();

    lintbridge()
        .arg("--config")
        .arg(&config)
        .arg("--quiet")
        .write_stdin(input)
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""capabilities""#))
        .stdout(predicate::str::contains(r#""name":"lintbridge""#));
}
