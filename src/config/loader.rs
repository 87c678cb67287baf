//! Configuration file discovery and loading.

use crate::config::schema::BootstrapConfig;
use crate::error::{BootstepError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding project configuration.
pub const CONFIG_DIR: &str = ".bootstep";

/// Configuration file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.yml";

/// Locations of configuration files for a project.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Explicit path given on the command line
    pub explicit: Option<PathBuf>,

    /// Project config: .bootstep/config.yml
    pub project: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover config files for the given project root.
    pub fn discover(project_root: &Path) -> Self {
        Self {
            explicit: None,
            project: Self::find_project_config(project_root),
        }
    }

    /// Use `path` instead of the discovered project config.
    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    fn find_project_config(project_root: &Path) -> Option<PathBuf> {
        let path = default_config_path(project_root);
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// The file that should be loaded, if any.
    pub fn resolved(&self) -> Option<&Path> {
        self.explicit.as_deref().or(self.project.as_deref())
    }

    /// Check if any project config exists.
    pub fn has_project_config(&self) -> bool {
        self.project.is_some()
    }
}

/// Expected location of the project config.
pub fn default_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Find the project root by walking up from `start`.
///
/// Looks for a `.bootstep` directory first and falls back to `.git`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(CONFIG_DIR).is_dir() {
            return Some(current);
        }

        if current.join(".git").exists() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load a single config file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_config_file(path: &Path) -> Result<BootstrapConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BootstepError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            BootstepError::Io(e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse YAML content into a [`BootstrapConfig`].
///
/// `source_path` is only used for error reporting.
pub fn parse_config(content: &str, source_path: &Path) -> Result<BootstrapConfig> {
    serde_yaml::from_str(content).map_err(|e| BootstepError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load the configuration for a project.
///
/// `explicit` takes precedence over `.bootstep/config.yml`.
pub fn load_config(project_root: &Path, explicit: Option<&Path>) -> Result<BootstrapConfig> {
    let mut paths = ConfigPaths::discover(project_root);
    if let Some(path) = explicit {
        paths = paths.with_explicit(path);
    }

    match paths.resolved() {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            load_config_file(path)
        }
        None => Err(BootstepError::ConfigNotFound {
            path: default_config_path(project_root),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_project_config(root: &Path, content: &str) -> PathBuf {
        let dir = root.join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn discovers_project_config() {
        let temp = TempDir::new().unwrap();
        assert!(!ConfigPaths::discover(temp.path()).has_project_config());

        let path = write_project_config(temp.path(), "steps: {}");
        let paths = ConfigPaths::discover(temp.path());
        assert_eq!(paths.resolved(), Some(path.as_path()));
    }

    #[test]
    fn explicit_path_wins() {
        let temp = TempDir::new().unwrap();
        write_project_config(temp.path(), "app_name: project");
        let other = temp.path().join("other.yml");
        fs::write(&other, "app_name: other").unwrap();

        let config = load_config(temp.path(), Some(&other)).unwrap();
        assert_eq!(config.app_name.as_deref(), Some("other"));
    }

    #[test]
    fn missing_config_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = load_config(temp.path(), None).unwrap_err();
        assert!(matches!(err, BootstepError::ConfigNotFound { .. }));
    }

    #[test]
    fn invalid_yaml_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = write_project_config(temp.path(), "steps: [unclosed");
        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, BootstepError::ConfigParseError { .. }));
    }

    #[test]
    fn finds_root_from_subdirectory() {
        let temp = TempDir::new().unwrap();
        write_project_config(temp.path(), "");
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested), Some(temp.path().to_path_buf()));
    }
}
