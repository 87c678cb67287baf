//! Configuration loading, parsing, and validation.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Validation in [`validator`]
//!
//! # Example
//!
//! ```
//! use bootstep::config::{load_config, validate};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let config_dir = temp.path().join(".bootstep");
//! fs::create_dir_all(&config_dir).unwrap();
//! fs::write(
//!     config_dir.join("config.yml"),
//!     "steps:\n  install:\n    command: echo install\n",
//! )
//! .unwrap();
//!
//! let config = load_config(temp.path(), None).unwrap();
//! validate(&config).unwrap();
//! assert!(config.steps.contains_key("install"));
//! ```

pub mod loader;
pub mod schema;
pub mod validator;

pub use schema::{BootstrapConfig, RetryConfig, Settings, StepConfig};

pub use loader::{
    default_config_path, find_project_root, load_config, load_config_file, parse_config,
    ConfigPaths, CONFIG_DIR, CONFIG_FILE,
};

pub use validator::{validate, validate_config, ValidationError};
