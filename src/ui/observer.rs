//! Progress observers that render to the terminal.

use std::io::Write;

use indicatif::{ProgressBar, ProgressStyle};

use crate::runner::{ProgressKind, ProgressObserver, RunResult, StepProgressEvent, StepStatus};

use super::output::OutputMode;
use super::theme::Theme;

/// Prints one themed line per progress event.
///
/// In [`OutputMode::Normal`] on a terminal an `indicatif` bar counts finished
/// steps beneath the log lines.
#[derive(Debug)]
pub struct ConsoleObserver {
    theme: Theme,
    mode: OutputMode,
    bar: ProgressBar,
}

impl ConsoleObserver {
    /// Observer for a run of `total_steps` steps.
    pub fn new(theme: Theme, mode: OutputMode, total_steps: usize) -> Self {
        let bar = if mode.shows_progress_bar() && console::Term::stdout().is_term() {
            let bar = ProgressBar::new(total_steps as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:30.magenta/dim} {pos}/{len} steps {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        Self { theme, mode, bar }
    }

    /// Observer that never draws a bar.
    pub fn without_bar(theme: Theme, mode: OutputMode) -> Self {
        Self {
            theme,
            mode,
            bar: ProgressBar::hidden(),
        }
    }

    /// Line printed for `event`, if the mode shows it.
    pub fn render(&self, event: &StepProgressEvent) -> Option<String> {
        let name = event.step_name.as_str();
        match event.kind {
            ProgressKind::Failure => {
                let error = event
                    .metadata
                    .get("error_message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("failed");
                Some(self.theme.format_error(&format!("{} - {}", name, error)))
            }
            _ if !self.mode.shows_status() => None,
            ProgressKind::Start => Some(self.theme.format_step(name, "starting")),
            ProgressKind::Retrying => Some(self.theme.format_retry(&event.message)),
            ProgressKind::Complete => Some(self.theme.format_success(name)),
            ProgressKind::Running | ProgressKind::Information
                if self.mode.shows_step_messages() =>
            {
                let percent = event
                    .percent
                    .map(|p| format!(" {}", self.theme.dim.apply_to(format!("({}%)", p))))
                    .unwrap_or_default();
                Some(format!(
                    "  {} {}{}",
                    self.theme.dim.apply_to(format!("{}:", name)),
                    event.message,
                    percent
                ))
            }
            ProgressKind::Running | ProgressKind::Information => None,
        }
    }

    /// Remove the progress bar.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn print(&self, line: &str) {
        if self.bar.is_hidden() {
            println!("{}", line);
        } else {
            self.bar.println(line);
        }
    }
}

impl ProgressObserver for ConsoleObserver {
    fn on_event(&self, event: &StepProgressEvent) -> anyhow::Result<()> {
        if let Some(line) = self.render(event) {
            self.print(&line);
        }
        match event.kind {
            ProgressKind::Start => self.bar.set_message(event.step_name.clone()),
            ProgressKind::Complete | ProgressKind::Failure => self.bar.inc(1),
            _ => {}
        }
        Ok(())
    }
}

/// Writes every event to stdout as one JSON object per line.
#[derive(Debug, Default)]
pub struct JsonObserver;

impl ProgressObserver for JsonObserver {
    fn on_event(&self, event: &StepProgressEvent) -> anyhow::Result<()> {
        let line = serde_json::to_string(event)?;
        writeln!(std::io::stdout().lock(), "{}", line)?;
        Ok(())
    }
}

/// Per-step summary lines for a finished run, followed by steps never run.
pub fn render_summary(result: &RunResult, theme: &Theme) -> Vec<String> {
    let mut lines = Vec::new();

    for report in &result.steps {
        let line = report.summary_line();
        lines.push(match report.status {
            StepStatus::Completed => format!("  {}", theme.success.apply_to(line)),
            StepStatus::Failed => format!("  {}", theme.error.apply_to(line)),
            StepStatus::Cancelled => format!("  {}", theme.dim.apply_to(line)),
        });
    }
    for name in &result.skipped {
        let note = match &result.failure {
            Some(failure) if failure.blocked.contains(name) => {
                format!("{} (blocked by {})", name, failure.step)
            }
            _ => format!("{} (not run)", name),
        };
        lines.push(format!("  {}", theme.format_skipped(&note)));
    }

    lines
}
