//! Steps: the units of work the engine orchestrates.
//!
//! - [`Step`] - The contract every step implements
//! - [`StepContext`] - Cancellation, progress, and attempt number for one execution
//! - [`StepError`] - Classified step failures
//! - [`FnStep`] - A step built from a closure
//! - [`CommandStep`] - A step that runs a shell command
//!
//! # Example
//!
//! ```
//! use bootstep::steps::{CommandStep, Step};
//!
//! let step = CommandStep::new("install", "npm install").depends_on(["node"]);
//! assert_eq!(step.name(), "install");
//! assert_eq!(Step::depends_on(&step), ["node".to_string()]);
//! ```

pub mod command;
pub mod step;

pub use command::CommandStep;
pub use step::{FnStep, Step, StepContext, StepError};
