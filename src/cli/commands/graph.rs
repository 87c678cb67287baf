//! Graph command implementation.
//!
//! The `bootstep graph` command prints the execution levels without running
//! anything.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use crate::cli::args::GraphArgs;
use crate::error::Result;
use crate::runner::ExecutionGraph;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use super::load_project_config;

/// The graph command implementation.
pub struct GraphCommand {
    project_root: PathBuf,
    config_path: Option<PathBuf>,
    args: GraphArgs,
}

#[derive(Debug, Serialize)]
struct LevelView {
    level: usize,
    steps: Vec<String>,
}

impl GraphCommand {
    pub fn new(project_root: &Path, config_path: Option<&Path>, args: GraphArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config_path: config_path.map(Path::to_path_buf),
            args,
        }
    }

    pub fn args(&self) -> &GraphArgs {
        &self.args
    }
}

#[async_trait]
impl Command for GraphCommand {
    async fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config =
            match load_project_config(&self.project_root, self.config_path.as_deref(), ui)? {
                Ok(config) => config,
                Err(result) => return Ok(result),
            };

        let steps = config.command_steps(&self.project_root);
        let graph = match ExecutionGraph::create(&steps) {
            Ok(graph) => graph,
            Err(e) if e.is_validation_error() => {
                ui.error(&e.to_string());
                return Ok(CommandResult::failure(1));
            }
            Err(e) => return Err(e),
        };

        let levels: Vec<LevelView> = graph
            .level_names()
            .into_iter()
            .enumerate()
            .map(|(level, steps)| LevelView { level, steps })
            .collect();

        if self.args.json {
            let json = serde_json::to_string_pretty(&levels).map_err(anyhow::Error::from)?;
            println!("{}", json);
            return Ok(CommandResult::success());
        }

        for view in &levels {
            let label = format!("Level {}:", view.level);
            let line = format!("{} {}", ui.theme().highlight.apply_to(label), view.steps.join(", "));
            ui.message(&line);
        }
        ui.message(&format!(
            "{} step(s) in {} level(s)",
            graph.step_count(),
            graph.level_count()
        ));

        Ok(CommandResult::success())
    }
}
