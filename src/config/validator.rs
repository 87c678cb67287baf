//! Configuration validation rules.
//!
//! - Steps must have a command
//! - `depends_on` must reference existing steps
//! - A step may not depend on itself
//! - No circular dependencies allowed

use crate::config::schema::BootstrapConfig;
use crate::error::{BootstepError, Result};
use crate::runner::DependencyGraph;
use serde::Serialize;

/// Validation error with context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
    /// Step name if error is step-specific
    pub step: Option<String>,
}

impl ValidationError {
    fn for_step(rule: &str, step: &str, message: String) -> Self {
        Self {
            rule: rule.to_string(),
            message,
            step: Some(step.to_string()),
        }
    }
}

/// Validate a configuration and return all errors.
///
/// All problems are collected rather than stopping at the first one.
pub fn validate_config(config: &BootstrapConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_steps(config));
    errors.extend(validate_dependencies(config));

    errors
}

fn validate_steps(config: &BootstrapConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (name, step) in &config.steps {
        if step.command.as_deref().map_or(true, |c| c.trim().is_empty()) {
            errors.push(ValidationError::for_step(
                "missing-command",
                name,
                format!("Step '{}' must have a 'command'", name),
            ));
        }

        for dep in &step.depends_on {
            if dep == name {
                errors.push(ValidationError::for_step(
                    "self-dependency",
                    name,
                    format!("Step '{}' depends on itself", name),
                ));
            } else if !config.steps.contains_key(dep) {
                errors.push(ValidationError::for_step(
                    "unknown-step",
                    name,
                    format!("Step '{}' depends on '{}' which does not exist", name, dep),
                ));
            }
        }
    }

    errors
}

/// Report one dependency cycle among known steps.
fn validate_dependencies(config: &BootstrapConfig) -> Vec<ValidationError> {
    let builder = config
        .steps
        .iter()
        .fold(DependencyGraph::builder(), |builder, (name, step)| {
            let deps = step
                .depends_on
                .iter()
                .filter(|d| *d != name && config.steps.contains_key(*d))
                .cloned()
                .collect();
            builder.add_step(name.as_str(), deps)
        });

    let Ok(graph) = builder.build() else {
        return Vec::new();
    };

    match graph.find_cycle() {
        Some(cycle) => vec![ValidationError::for_step(
            "circular-dependency",
            &cycle[0],
            format!("Circular dependency detected: {}", cycle.join(" -> ")),
        )],
        None => Vec::new(),
    }
}

/// Validate and return Result (for convenience).
///
/// # Errors
///
/// Returns `ConfigValidationError` if any validation rules fail. Its message
/// joins every problem with `; `, in the order [`validate_config`] reports them.
pub fn validate(config: &BootstrapConfig) -> Result<()> {
    let errors = validate_config(config);

    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
        Err(BootstepError::ConfigValidationError {
            message: messages.join("; "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StepConfig;

    fn step(command: &str, deps: &[&str]) -> StepConfig {
        StepConfig {
            command: Some(command.to_string()),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn validates_step_has_command() {
        let mut config = BootstrapConfig::default();
        config
            .steps
            .insert("empty".to_string(), StepConfig::default());

        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.rule == "missing-command"));
    }

    #[test]
    fn validates_depends_on_exists() {
        let mut config = BootstrapConfig::default();
        config
            .steps
            .insert("test".to_string(), step("echo test", &["nonexistent"]));

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "unknown-step");
        assert_eq!(errors[0].step.as_deref(), Some("test"));
    }

    #[test]
    fn detects_self_dependency() {
        let mut config = BootstrapConfig::default();
        config.steps.insert("a".to_string(), step("a", &["a"]));

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "self-dependency");
    }

    #[test]
    fn detects_circular_dependency() {
        let mut config = BootstrapConfig::default();
        config.steps.insert("a".to_string(), step("a", &["b"]));
        config.steps.insert("b".to_string(), step("b", &["a"]));

        let errors = validate_config(&config);
        let cycle = errors
            .iter()
            .find(|e| e.rule == "circular-dependency")
            .unwrap();
        assert_eq!(cycle.message, "Circular dependency detected: a -> b -> a");
    }

    #[test]
    fn collects_every_problem() {
        let mut config = BootstrapConfig::default();
        config
            .steps
            .insert("empty".to_string(), StepConfig::default());
        config
            .steps
            .insert("orphan".to_string(), step("x", &["ghost"]));

        assert_eq!(validate_config(&config).len(), 2);
    }

    #[test]
    fn valid_config_returns_no_errors() {
        let mut config = BootstrapConfig::default();
        config.steps.insert("a".to_string(), step("a", &[]));
        config.steps.insert("b".to_string(), step("b", &["a"]));

        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn validate_returns_result() {
        let config = BootstrapConfig::default();
        assert!(validate(&config).is_ok());

        let mut bad_config = BootstrapConfig::default();
        bad_config
            .steps
            .insert("empty".to_string(), StepConfig::default());
        let err = validate(&bad_config).unwrap_err();
        assert!(matches!(err, BootstepError::ConfigValidationError { .. }));
    }

    #[test]
    fn validate_message_lists_every_problem() {
        let mut config = BootstrapConfig::default();
        config
            .steps
            .insert("empty".to_string(), StepConfig::default());
        config
            .steps
            .insert("api".to_string(), step("./api", &["ghost"]));

        let message = match validate(&config) {
            Err(BootstepError::ConfigValidationError { message }) => message,
            other => panic!("expected ConfigValidationError, got {:?}", other),
        };
        let expected: Vec<String> = validate_config(&config)
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(expected.len(), 2);
        assert_eq!(message, expected.join("; "));
    }
}
