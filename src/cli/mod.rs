//! Command-line interface for bootstep.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, GraphArgs, LintArgs, RunArgs};
pub use commands::{exit_code_for, Command, CommandDispatcher, CommandResult};
