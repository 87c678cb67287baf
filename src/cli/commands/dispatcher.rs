//! Command dispatching.
//!
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands, RunArgs};
use crate::error::{BootstepError, Result};
use crate::ui::UserInterface;

use super::graph::GraphCommand;
use super::lint::LintCommand;
use super::run::RunCommand;

/// Exit code for a run stopped by cancellation.
pub const EXIT_ABORTED: i32 = 130;

/// Exit code when no configuration file exists.
pub const EXIT_NO_CONFIG: i32 = 2;

/// Exit code for an error that escaped a command.
pub fn exit_code_for(error: &BootstepError) -> i32 {
    match error {
        BootstepError::ConfigNotFound { .. } => EXIT_NO_CONFIG,
        BootstepError::Aborted { .. } => EXIT_ABORTED,
        _ => 1,
    }
}

/// Trait for command implementations.
#[async_trait]
pub trait Command {
    /// Execute the command, reporting through `ui`.
    async fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    project_root: PathBuf,
    cancel: CancellationToken,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given project root.
    pub fn new(project_root: PathBuf) -> Self {
        Self {
            project_root,
            cancel: CancellationToken::new(),
        }
    }

    /// Token cancelled when the user interrupts the run.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Route the CLI subcommand to its implementation and execute it.
    pub async fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = cli.config.as_deref();
        match &cli.command {
            Some(Commands::Run(args)) => {
                RunCommand::new(&self.project_root, config, args.clone())
                    .with_cancellation(self.cancel.clone())
                    .execute(ui)
                    .await
            }
            Some(Commands::Graph(args)) => {
                GraphCommand::new(&self.project_root, config, args.clone())
                    .execute(ui)
                    .await
            }
            Some(Commands::Lint(args)) => {
                LintCommand::new(&self.project_root, config, args.clone())
                    .execute(ui)
                    .await
            }
            None => {
                RunCommand::new(&self.project_root, config, RunArgs::default())
                    .with_cancellation(self.cancel.clone())
                    .execute(ui)
                    .await
            }
        }
    }
}
