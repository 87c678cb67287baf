//! Shell command steps.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::step::{Step, StepContext, StepError};

/// A step that runs a shell command.
///
/// A non-zero exit status is a failure of kind `ExitStatus`; a command that
/// cannot be started fails with kind `Spawn`. The child process is killed
/// when the run is cancelled.
#[derive(Debug, Clone)]
pub struct CommandStep {
    name: String,
    command: String,
    depends_on: Vec<String>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl CommandStep {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            depends_on: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Working directory for the command.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add an environment variable, merged over the inherited environment.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn build(&self) -> Command {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C");
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c");
            cmd
        };
        cmd.arg(&self.command);

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Step for CommandStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    async fn execute(&self, ctx: &StepContext) -> Result<(), StepError> {
        if ctx.is_cancelled() {
            return Err(StepError::Cancelled);
        }

        debug!(step = %self.name, attempt = ctx.attempt(), "Running: {}", self.command);
        let child = self.build().spawn().map_err(|e| {
            StepError::failed("Spawn", format!("failed to start '{}': {}", self.command, e))
        })?;
        ctx.progress().running(format!("$ {}", self.command), None);

        // Dropping the child on cancellation kills it.
        let output = tokio::select! {
            _ = ctx.cancellation().cancelled() => return Err(StepError::Cancelled),
            output = child.wait_with_output() => {
                output.map_err(|e| StepError::failed("Io", e.to_string()))?
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(step = %self.name, "stdout:\n{}", stdout.trim_end());
        }

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let status = match output.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "a signal".to_string(),
        };
        let message = match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            Some(line) => format!("'{}' terminated with {}: {}", self.command, status, line.trim()),
            None => format!("'{}' terminated with {}", self.command, status),
        };
        Err(StepError::failed("ExitStatus", message))
    }
}
