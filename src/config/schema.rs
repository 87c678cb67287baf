//! Configuration schema definitions.
//!
//! These structs map to the YAML configuration file format.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::runner::{BackoffKind, ExecutionEngine, RetryPolicy};
use crate::steps::{CommandStep, Step};

/// Root configuration structure for `.bootstep/config.yml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Application name (for display purposes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    /// Global settings
    pub settings: Settings,

    /// Step definitions, in input order
    pub steps: IndexMap<String, StepConfig>,
}

/// Settings that apply to every step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default retry behaviour
    pub retry: RetryConfig,

    /// Environment variables passed to every step
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

/// A single step definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    /// Shell command to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Steps that must complete first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Step-specific environment, layered over `settings.env`
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    /// Working directory, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Retry overrides for this step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

/// Retry settings as written in YAML.
///
/// Unset fields fall back to the enclosing configuration, and finally to
/// [`RetryPolicy::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff: Option<BackoffKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_delay_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter: Option<bool>,
}

impl RetryConfig {
    /// Fill unset fields from `base`.
    pub fn or(&self, base: &RetryConfig) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.or(base.max_attempts),
            backoff: self.backoff.or(base.backoff),
            initial_delay_ms: self.initial_delay_ms.or(base.initial_delay_ms),
            max_delay_ms: self.max_delay_ms.or(base.max_delay_ms),
            jitter: self.jitter.or(base.jitter),
        }
    }

    /// Convert to a runtime policy.
    pub fn to_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            backoff: self.backoff.unwrap_or(defaults.backoff),
            initial_delay: self
                .initial_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_delay),
            max_delay: self
                .max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_delay),
            use_jitter: self.jitter.unwrap_or(defaults.use_jitter),
            ..defaults
        }
    }
}

impl BootstrapConfig {
    /// Effective retry policy for the named step.
    pub fn retry_policy_for(&self, step: &str) -> RetryPolicy {
        match self.steps.get(step).and_then(|s| s.retry.as_ref()) {
            Some(retry) => retry.or(&self.settings.retry).to_policy(),
            None => self.settings.retry.to_policy(),
        }
    }

    /// Build a command step for every configured step, in input order.
    ///
    /// Steps without a command are skipped; `validate` reports them.
    pub fn command_steps(&self, project_root: &Path) -> Vec<Arc<dyn Step>> {
        self.steps
            .iter()
            .filter_map(|(name, step)| {
                let command = step.command.as_ref()?;
                let cwd = match &step.cwd {
                    Some(cwd) => project_root.join(cwd),
                    None => project_root.to_path_buf(),
                };
                let built = CommandStep::new(name.as_str(), command.as_str())
                    .depends_on(step.depends_on.iter().cloned())
                    .with_cwd(cwd)
                    .with_envs(self.settings.env.clone())
                    .with_envs(step.env.clone());
                Some(Arc::new(built) as Arc<dyn Step>)
            })
            .collect()
    }

    /// Engine configured with the default and per-step retry policies.
    pub fn engine(&self) -> ExecutionEngine {
        let engine = ExecutionEngine::new().with_default_policy(self.settings.retry.to_policy());
        self.steps
            .iter()
            .filter(|(_, step)| step.retry.is_some())
            .fold(engine, |engine, (name, _)| {
                engine.with_step_policy(name.as_str(), self.retry_policy_for(name))
            })
    }
}
