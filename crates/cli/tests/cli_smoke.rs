//! CLI smoke tests for stratus.
//!
//! These run the binary against throwaway projects. Nothing here talks to a
//! remote service: every apply or delete below fails before the first call.

use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

fn stratus_cmd(project: &Path) -> Command {
  let mut cmd = cargo_bin_cmd!("stratus");
  cmd
    .arg("--project")
    .arg(project)
    .env_remove("STRATUS_REGION")
    .env_remove("AWS_DEFAULT_REGION")
    .env("AWS_EC2_METADATA_DISABLED", "true");
  cmd
}

fn write_file(root: &Path, rel: &str, content: &str) {
  let path = root.join(rel);
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  std::fs::write(path, content).unwrap();
}

const SETTINGS: &str = r#"
project: demo
default-region: eu-west-1
lambdas:
  hello:
    code: hello
    handler: main.handler
    local-command: "cat"
"#;

fn hello_project() -> TempDir {
  let temp = TempDir::new().unwrap();
  write_file(temp.path(), "settings.yml", SETTINGS);
  write_file(temp.path(), "hello/main.py", "def handler(event, context):\n    return event\n");
  temp
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  cargo_bin_cmd!("stratus")
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  cargo_bin_cmd!("stratus")
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("stratus"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["build", "apply", "delete", "run"] {
    cargo_bin_cmd!("stratus")
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// build
// =============================================================================

#[test]
fn build_writes_numbered_artifacts() {
  let temp = hello_project();

  stratus_cmd(temp.path())
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("0001_p.json"));

  let build_dir = temp.path().join("_build");
  assert!(build_dir.join("0001_p.json").is_file());
  assert!(build_dir.join("0003_r.json").is_file());
}

#[test]
fn rebuild_is_byte_identical() {
  let temp = hello_project();
  let artifact = temp.path().join("_build").join("0003_r.json");

  stratus_cmd(temp.path()).arg("build").assert().success();
  let first = std::fs::read(&artifact).unwrap();
  stratus_cmd(temp.path()).arg("build").assert().success();
  let second = std::fs::read(&artifact).unwrap();

  assert_eq!(first, second);
}

#[test]
fn build_rejects_duplicate_names() {
  let temp = hello_project();
  write_file(
    temp.path(),
    "settings.yml",
    "project: demo\nlambdas:\n  say_hello:\n    code: hello\n  say-hello:\n    code: hello\n",
  );

  stratus_cmd(temp.path()).arg("build").assert().code(8);
}

#[test]
fn build_without_settings_is_a_configuration_error() {
  let temp = TempDir::new().unwrap();

  stratus_cmd(temp.path())
    .arg("build")
    .assert()
    .code(2)
    .stderr(predicate::str::contains("settings.yml"));
}

// =============================================================================
// apply / delete
// =============================================================================

#[test]
#[serial]
fn apply_without_build_exits_with_build_not_performed() {
  let temp = hello_project();

  stratus_cmd(temp.path())
    .args(["apply", "--stage", "dev"])
    .assert()
    .code(9)
    .stderr(predicate::str::contains("stratus build"));
}

#[test]
#[serial]
fn delete_without_build_exits_with_build_not_performed() {
  let temp = hello_project();

  stratus_cmd(temp.path()).args(["delete", "--stage", "dev"]).assert().code(9);
}

#[test]
fn invalid_stage_is_rejected() {
  let temp = hello_project();

  for stage in ["Prod", "x", "dev_1"] {
    stratus_cmd(temp.path())
      .args(["apply", "--stage", stage])
      .assert()
      .code(3)
      .stderr(predicate::str::contains("stage"));
  }
}

// =============================================================================
// run
// =============================================================================

#[cfg(unix)]
#[test]
fn run_passes_event_to_local_command() {
  let temp = hello_project();
  write_file(temp.path(), "event.json", r#"{"name": "world"}"#);

  stratus_cmd(temp.path())
    .args(["run", "lambda::hello", "--event"])
    .arg(temp.path().join("event.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains(r#"{"name":"world"}"#));
}

#[test]
fn run_unknown_function_is_not_found() {
  let temp = hello_project();

  stratus_cmd(temp.path()).args(["run", "lambda::missing"]).assert().code(4);
}
