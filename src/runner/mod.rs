//! Step execution orchestration.
//!
//! [`ExecutionGraph`] groups steps into levels, [`RetryPipeline`] applies a
//! [`RetryPolicy`] to one step, [`ProgressReporter`] fans events out to
//! observers, and [`ExecutionEngine`] drives the whole run.

pub mod dependency;
pub mod engine;
pub mod progress;
pub mod retry;

pub use dependency::{DependencyGraph, DependencyGraphBuilder, ExecutionGraph, ExecutionLevel};
pub use engine::{
    format_duration, ExecutionEngine, RunResult, RunState, StepFailure, StepReport, StepStatus,
};
pub use progress::{
    FnObserver, ProgressKind, ProgressObserver, ProgressReporter, StepProgressEvent,
    StepProgressHandle, TracingObserver,
};
pub use retry::{BackoffKind, Execution, RetryEvent, RetryPipeline, RetryPolicy};
