//! Terminal output for runs.
//!
//! - [`Theme`] - `console` styles used everywhere
//! - [`OutputMode`] - How much is printed
//! - [`ConsoleObserver`] - Renders progress events as themed lines
//! - [`JsonObserver`] - Emits progress events as JSON lines
//! - [`UserInterface`] - Output surface for commands, with [`TerminalUI`]
//!   and the test double [`MockUI`]
//!
//! # Example
//!
//! ```
//! use bootstep::runner::StepProgressEvent;
//! use bootstep::ui::{ConsoleObserver, OutputMode, Theme};
//!
//! let console = ConsoleObserver::without_bar(Theme::plain(), OutputMode::Normal);
//! let line = console.render(&StepProgressEvent::complete("install"));
//! assert_eq!(line.as_deref(), Some("✓ install"));
//! ```

pub mod mock;
pub mod observer;
pub mod output;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use observer::{render_summary, ConsoleObserver, JsonObserver};
pub use output::OutputMode;
pub use terminal::{TerminalUI, UserInterface};
pub use theme::{should_use_colors, Theme};
