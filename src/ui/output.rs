//! Output verbosity.

use std::str::FromStr;

/// How much a run prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Every progress event, including step messages.
    Verbose,
    /// Start, retry, completion, and failure lines.
    #[default]
    Normal,
    /// Failures and the final summary only.
    Quiet,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "verbose" => Ok(Self::Verbose),
            "normal" => Ok(Self::Normal),
            "quiet" => Ok(Self::Quiet),
            _ => Err(format!("unknown output mode: {}", s)),
        }
    }
}

impl OutputMode {
    /// Whether step-reported messages are shown.
    pub fn shows_step_messages(&self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Whether lifecycle lines (start, retry, complete) are shown.
    pub fn shows_status(&self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Whether the progress bar is drawn.
    pub fn shows_progress_bar(&self) -> bool {
        matches!(self, Self::Normal)
    }
}
