//! Integration tests for the command-line interface.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]
#![cfg(unix)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_project(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join(".bootstep");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.yml"), config).unwrap();
    temp
}

fn bootstep(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("bootstep"));
    cmd.current_dir(temp.path());
    cmd
}

const SIMPLE_CONFIG: &str = r#"
app_name: Test
steps:
  hello:
    command: echo hello
"#;

const CHAIN_CONFIG: &str = r#"
steps:
  a:
    command: "true"
  b:
    command: "true"
    depends_on: [a]
"#;

#[test]
fn cli_no_args_runs_default() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_CONFIG);
    bootstep(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 step(s) completed"));
    Ok(())
}

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("bootstep"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Dependency-aware bootstrap step runner"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("bootstep"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn cli_run_shows_step_lines() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(CHAIN_CONFIG);
    bootstep(&temp)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("◆ a starting"))
        .stdout(predicate::str::contains("✓ b"));
    Ok(())
}

#[test]
fn cli_run_no_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    bootstep(&temp)
        .arg("run")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No configuration found"));
    Ok(())
}

#[test]
fn cli_run_failing_step_exits_one() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(
        r#"
steps:
  broken:
    command: exit 3
  after:
    command: "true"
    depends_on: [broken]
"#,
    );
    bootstep(&temp)
        .args(["run", "--no-retry"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("after (blocked by broken)"))
        .stderr(predicate::str::contains("Step 'broken' (level 0) failed"));
    Ok(())
}

#[test]
fn cli_run_retries_flaky_step() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(
        r#"
steps:
  flaky:
    command: "test -f marker || { touch marker; exit 1; }"
    retry:
      max_attempts: 2
      initial_delay_ms: 10
      jitter: false
"#,
    );
    bootstep(&temp)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Retrying step 'flaky' (attempt 1/2)"));
    Ok(())
}

#[test]
fn cli_run_json_emits_event_lines() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(CHAIN_CONFIG);
    let output = bootstep(&temp).args(["run", "--json"]).output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let kinds: Vec<String> = stdout
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["kind"].as_str().unwrap().to_string()
        })
        .filter(|kind| kind != "running")
        .collect();
    assert_eq!(kinds, ["start", "complete", "start", "complete"]);
    Ok(())
}

#[test]
fn cli_quiet_hides_status_lines() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(CHAIN_CONFIG);
    bootstep(&temp)
        .args(["run", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("starting").not());
    Ok(())
}

#[test]
fn cli_explicit_config_path() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let path = temp.path().join("custom.yml");
    fs::write(&path, SIMPLE_CONFIG)?;

    bootstep(&temp)
        .arg("--config")
        .arg(&path)
        .arg("graph")
        .assert()
        .success()
        .stdout(predicate::str::contains("Level 0: hello"));
    Ok(())
}

#[test]
fn cli_graph_shows_levels() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(CHAIN_CONFIG);
    bootstep(&temp)
        .arg("graph")
        .assert()
        .success()
        .stdout(predicate::str::contains("Level 0: a"))
        .stdout(predicate::str::contains("Level 1: b"));
    Ok(())
}

#[test]
fn cli_lint_validates_config() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_CONFIG);
    bootstep(&temp)
        .arg("lint")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
    Ok(())
}

#[test]
fn cli_lint_reports_problems() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(
        r#"
steps:
  a:
    command: ./a
    depends_on: [ghost]
"#,
    );
    bootstep(&temp)
        .arg("lint")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[unknown-step]"));
    Ok(())
}

#[test]
fn cli_lint_json_format() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project("steps:\n  a: {}\n");
    bootstep(&temp)
        .args(["lint", "--format", "json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"rule\": \"missing-command\""));
    Ok(())
}

#[test]
fn cli_debug_flag_accepted() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_CONFIG);
    bootstep(&temp).args(["--debug", "lint"]).assert().success();
    Ok(())
}

#[test]
fn cli_invalid_command_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("bootstep"));
    cmd.arg("nonexistent");
    cmd.assert().failure();
    Ok(())
}
