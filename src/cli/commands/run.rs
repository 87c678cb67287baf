//! Run command implementation.
//!
//! The `bootstep run` command executes every configured step.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::cli::args::RunArgs;
use crate::config::{validate_config, BootstrapConfig};
use crate::error::{BootstepError, Result};
use crate::runner::{
    format_duration, ExecutionEngine, ProgressReporter, RetryPolicy, TracingObserver,
};
use crate::ui::{render_summary, ConsoleObserver, JsonObserver, UserInterface};

use super::dispatcher::{Command, CommandResult, EXIT_ABORTED};
use super::load_project_config;

/// The run command implementation.
pub struct RunCommand {
    project_root: PathBuf,
    config_path: Option<PathBuf>,
    args: RunArgs,
    cancel: CancellationToken,
}

impl RunCommand {
    pub fn new(project_root: &Path, config_path: Option<&Path>, args: RunArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config_path: config_path.map(Path::to_path_buf),
            args,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancel the run when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    fn engine(&self, config: &BootstrapConfig) -> ExecutionEngine {
        if self.args.no_retry {
            ExecutionEngine::new().with_default_policy(RetryPolicy::none())
        } else {
            config.engine()
        }
    }
}

#[async_trait]
impl Command for RunCommand {
    async fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config =
            match load_project_config(&self.project_root, self.config_path.as_deref(), ui)? {
                Ok(config) => config,
                Err(result) => return Ok(result),
            };

        let problems = validate_config(&config);
        if !problems.is_empty() {
            for problem in &problems {
                ui.error(&problem.message);
            }
            return Ok(CommandResult::failure(1));
        }

        let steps = config.command_steps(&self.project_root);
        let mut reporter = ProgressReporter::disabled();
        if tracing::enabled!(tracing::Level::DEBUG) {
            reporter = reporter.with_observer(TracingObserver);
        }

        let console = if self.args.json {
            reporter = reporter.with_observer(JsonObserver);
            None
        } else {
            ui.show_header(config.app_name.as_deref().unwrap_or("bootstep"));
            let console = Arc::new(ConsoleObserver::new(
                ui.theme().clone(),
                ui.output_mode(),
                steps.len(),
            ));
            reporter = reporter.with_observer(Arc::clone(&console));
            Some(console)
        };

        let outcome = self
            .engine(&config)
            .with_reporter(reporter)
            .run(steps, self.cancel.clone())
            .await;

        if let Some(console) = &console {
            console.finish();
        }

        match outcome {
            Ok(result) => {
                if !self.args.json {
                    for line in render_summary(&result, ui.theme()) {
                        ui.message(&line);
                    }
                }
                match &result.failure {
                    None => {
                        if !self.args.json {
                            ui.success(&format!(
                                "{} step(s) completed in {}",
                                result.steps.len(),
                                format_duration(result.duration)
                            ));
                        }
                        Ok(CommandResult::success())
                    }
                    Some(failure) => {
                        ui.error(&failure.to_string());
                        Ok(CommandResult::failure(1))
                    }
                }
            }
            Err(BootstepError::Aborted { levels_completed }) => {
                ui.warning(&format!(
                    "Run aborted after {} completed level(s)",
                    levels_completed
                ));
                Ok(CommandResult::failure(EXIT_ABORTED))
            }
            Err(e) => Err(e),
        }
    }
}
