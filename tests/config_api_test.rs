//! Integration tests for config module public API.

use bootstep::config::{
    find_project_root, load_config, validate, validate_config, BootstrapConfig, ConfigPaths,
    RetryConfig,
};
use bootstep::runner::BackoffKind;
use bootstep::BootstepError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(root: &Path, content: &str) {
    let dir = root.join(".bootstep");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.yml"), content).unwrap();
}

#[test]
fn public_api_is_accessible() {
    let _config = BootstrapConfig::default();
    let _retry = RetryConfig::default();
}

#[test]
fn full_config_workflow() {
    let temp = TempDir::new().unwrap();
    write_config(
        temp.path(),
        r#"
app_name: TestApp
settings:
  retry:
    max_attempts: 2
    backoff: constant
  env:
    APP_ENV: test
steps:
  network:
    command: ./bin/check-network
  database:
    command: ./bin/migrate
    depends_on: [network]
    retry:
      max_attempts: 5
      backoff: linear
"#,
    );

    assert!(ConfigPaths::discover(temp.path()).has_project_config());
    let config = load_config(temp.path(), None).unwrap();
    validate(&config).unwrap();

    assert_eq!(config.app_name.as_deref(), Some("TestApp"));
    assert_eq!(config.settings.env["APP_ENV"], "test");

    let db = config.retry_policy_for("database");
    assert_eq!(db.max_attempts, 5);
    assert_eq!(db.backoff, BackoffKind::Linear);

    let net = config.retry_policy_for("network");
    assert_eq!(net.max_attempts, 2);
    assert_eq!(net.backoff, BackoffKind::Constant);

    let steps = config.command_steps(temp.path());
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[1].depends_on(), ["network".to_string()]);
}

#[test]
fn invalid_config_collects_errors() {
    let temp = TempDir::new().unwrap();
    write_config(
        temp.path(),
        r#"
steps:
  a:
    command: ./a
    depends_on: [b]
  b:
    command: ./b
    depends_on: [a]
  c:
    depends_on: [missing]
"#,
    );

    let config = load_config(temp.path(), None).unwrap();
    let rules: Vec<String> = validate_config(&config)
        .into_iter()
        .map(|e| e.rule)
        .collect();

    assert!(rules.contains(&"missing-command".to_string()));
    assert!(rules.contains(&"unknown-step".to_string()));
    assert!(rules.contains(&"circular-dependency".to_string()));

    let err = validate(&config).unwrap_err();
    assert!(matches!(err, BootstepError::ConfigValidationError { .. }));
}

#[test]
fn missing_config_returns_not_found() {
    let temp = TempDir::new().unwrap();
    let result = load_config(temp.path(), None);
    assert!(matches!(result, Err(BootstepError::ConfigNotFound { .. })));
}

#[test]
fn project_root_discovery() {
    let temp = TempDir::new().unwrap();
    write_config(temp.path(), "steps: {}");
    let nested = temp.path().join("src").join("deep");
    fs::create_dir_all(&nested).unwrap();

    assert_eq!(find_project_root(&nested).unwrap(), temp.path());
}
