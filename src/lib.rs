//! Bootstep - Dependency-ordered bootstrap execution.
//!
//! Bootstep runs a set of named steps whose dependencies form a directed
//! acyclic graph. Steps are grouped into levels by the length of their
//! longest dependency chain; every step of a level runs concurrently and the
//! next level starts only once the whole level has succeeded. Failing steps
//! are retried according to a backoff policy, and every lifecycle moment is
//! published as a progress event.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, parsing, and validation
//! - [`error`] - Error types and result aliases
//! - [`runner`] - Dependency graph, retry policies, progress, and the engine
//! - [`steps`] - The step contract and built-in steps
//! - [`ui`] - Terminal rendering of progress and results
//!
//! # Example
//!
//! ```
//! use bootstep::runner::{ExecutionEngine, RetryPolicy};
//! use bootstep::steps::{FnStep, StepError};
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test_block(async {
//! let steps = vec![
//!     FnStep::new("network", |_| async { Ok::<_, StepError>(()) }).shared(),
//!     FnStep::new("database", |_| async { Ok::<_, StepError>(()) })
//!         .depends_on(["network"])
//!         .shared(),
//! ];
//!
//! let engine = ExecutionEngine::new().with_default_policy(RetryPolicy::none());
//! let result = engine.run(steps, CancellationToken::new()).await.unwrap();
//! assert!(result.success());
//! assert_eq!(result.levels_completed, 2);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod runner;
pub mod steps;
pub mod ui;

pub use error::{BootstepError, Result};
