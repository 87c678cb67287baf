//! Lint command implementation.
//!
//! The `bootstep lint` command validates the configuration file and lists
//! every problem found.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::cli::args::LintArgs;
use crate::config::validate_config;
use crate::error::Result;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use super::load_project_config;

/// The lint command implementation.
pub struct LintCommand {
    project_root: PathBuf,
    config_path: Option<PathBuf>,
    args: LintArgs,
}

impl LintCommand {
    pub fn new(project_root: &Path, config_path: Option<&Path>, args: LintArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config_path: config_path.map(Path::to_path_buf),
            args,
        }
    }

    pub fn args(&self) -> &LintArgs {
        &self.args
    }
}

#[async_trait]
impl Command for LintCommand {
    async fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config =
            match load_project_config(&self.project_root, self.config_path.as_deref(), ui)? {
                Ok(config) => config,
                Err(result) => return Ok(result),
            };

        let problems = validate_config(&config);

        if self.args.format == "json" {
            let json = serde_json::to_string_pretty(&problems).map_err(anyhow::Error::from)?;
            println!("{}", json);
        } else if problems.is_empty() {
            ui.success(&format!(
                "Configuration is valid ({} step(s))",
                config.steps.len()
            ));
        } else {
            for problem in &problems {
                ui.error(&format!("[{}] {}", problem.rule, problem.message));
            }
            ui.message(&format!("{} problem(s) found", problems.len()));
        }

        if problems.is_empty() {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::failure(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    fn project(config: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".bootstep");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.yml"), config).unwrap();
        temp
    }

    #[tokio::test]
    async fn valid_config_passes() {
        let temp = project("steps:\n  a:\n    command: echo a\n");
        let mut ui = MockUI::new();
        let result = LintCommand::new(temp.path(), None, LintArgs::default())
            .execute(&mut ui)
            .await
            .unwrap();

        assert!(result.success);
        assert!(ui.has_output("Configuration is valid (1 step(s))"));
    }

    #[tokio::test]
    async fn lists_rule_for_each_problem() {
        let temp = project("steps:\n  a:\n    command: echo a\n    depends_on: [a]\n");
        let mut ui = MockUI::new();
        let result = LintCommand::new(temp.path(), None, LintArgs::default())
            .execute(&mut ui)
            .await
            .unwrap();

        assert_eq!(result.exit_code, 1);
        assert_eq!(ui.errors(), ["[self-dependency] Step 'a' depends on itself"]);
    }

    #[tokio::test]
    async fn missing_config_exits_two() {
        let temp = TempDir::new().unwrap();
        let mut ui = MockUI::new();
        let result = LintCommand::new(temp.path(), None, LintArgs::default())
            .execute(&mut ui)
            .await
            .unwrap();

        assert_eq!(result.exit_code, 2);
        assert!(ui.has_output("No configuration found"));
    }
}
