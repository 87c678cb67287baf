//! Error types for bootstep operations.
//!
//! This module defines [`BootstepError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Graph validation problems (`MissingDependency`, `CircularDependency`,
//!   `DuplicateStep`) are returned before any step runs
//! - Step failures are not errors of this type: they are captured into
//!   [`RunResult`](crate::runner::RunResult) as a [`StepError`](crate::steps::StepError)
//! - A cancelled run surfaces as `Aborted`
//! - Use `anyhow::Error` (via `BootstepError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for bootstep operations.
#[derive(Debug, Error)]
pub enum BootstepError {
    /// A step depends on a name that is not part of the step set.
    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    MissingDependency { step: String, dependency: String },

    /// Step dependency cycle detected.
    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// Two steps share the same name.
    #[error("Duplicate step name: {name}")]
    DuplicateStep { name: String },

    /// The run was cancelled before it could finish.
    #[error("Run aborted after {levels_completed} completed level(s)")]
    Aborted { levels_completed: usize },

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BootstepError {
    /// Whether this error was raised while validating the step graph.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            BootstepError::MissingDependency { .. }
                | BootstepError::CircularDependency { .. }
                | BootstepError::DuplicateStep { .. }
        )
    }
}

/// Result type alias for bootstep operations.
pub type Result<T> = std::result::Result<T, BootstepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dependency_displays_step_and_dependency() {
        let err = BootstepError::MissingDependency {
            step: "migrate".into(),
            dependency: "database".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("migrate"));
        assert!(msg.contains("database"));
    }

    #[test]
    fn circular_dependency_displays_cycle() {
        let err = BootstepError::CircularDependency {
            cycle: "a -> b -> a".into(),
        };
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn aborted_displays_levels_completed() {
        let err = BootstepError::Aborted {
            levels_completed: 2,
        };
        assert!(err.to_string().contains("2 completed level"));
    }

    #[test]
    fn config_parse_error_displays_path_and_message() {
        let err = BootstepError::ConfigParseError {
            path: PathBuf::from("/config.yml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/config.yml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn validation_errors_are_classified() {
        assert!(BootstepError::DuplicateStep { name: "a".into() }.is_validation_error());
        assert!(BootstepError::CircularDependency { cycle: "a".into() }.is_validation_error());
        assert!(!BootstepError::Aborted {
            levels_completed: 0
        }
        .is_validation_error());
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: BootstepError = io_err.into();
        assert!(matches!(err, BootstepError::Io(_)));
    }
}
