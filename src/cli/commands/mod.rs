//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait and is routed by
//! [`CommandDispatcher`], so global flags are handled in one place.

pub mod dispatcher;
pub mod graph;
pub mod lint;
pub mod run;

pub use dispatcher::{
    exit_code_for, Command, CommandDispatcher, CommandResult, EXIT_ABORTED, EXIT_NO_CONFIG,
};

use std::path::Path;

use crate::config::{load_config, BootstrapConfig};
use crate::error::{BootstepError, Result};
use crate::ui::UserInterface;

/// Load the project config, reporting the usual user errors through `ui`.
///
/// The inner `Err` carries the result the command should return.
pub(crate) fn load_project_config(
    project_root: &Path,
    explicit: Option<&Path>,
    ui: &mut dyn UserInterface,
) -> Result<std::result::Result<BootstrapConfig, CommandResult>> {
    match load_config(project_root, explicit) {
        Ok(config) => Ok(Ok(config)),
        Err(BootstepError::ConfigNotFound { path }) => {
            ui.error(&format!("No configuration found at {}", path.display()));
            Ok(Err(CommandResult::failure(EXIT_NO_CONFIG)))
        }
        Err(BootstepError::ConfigParseError { path, message }) => {
            ui.error(&format!("Parse error in {}: {}", path.display(), message));
            Ok(Err(CommandResult::failure(1)))
        }
        Err(e) => Err(e),
    }
}
