//! The step contract: the unit of work the engine orchestrates.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::runner::progress::{ProgressReporter, StepProgressHandle};

/// Error returned by a step execution.
#[derive(Debug, Error)]
pub enum StepError {
    /// The step observed cancellation and stopped. Never retried.
    #[error("step was cancelled")]
    Cancelled,

    /// The step failed with a classified error.
    #[error("{message}")]
    Failed { kind: String, message: String },

    /// Unclassified failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StepError {
    /// Create a classified failure.
    pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        StepError::Failed {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Short classification of the error, used in failure reports.
    pub fn kind(&self) -> &str {
        match self {
            StepError::Cancelled => "Cancelled",
            StepError::Failed { kind, .. } => kind,
            StepError::Other(_) => "Error",
        }
    }

    /// Whether this error signals cooperative cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StepError::Cancelled)
    }
}

/// Context handed to a step for one execution attempt.
#[derive(Debug, Clone)]
pub struct StepContext {
    cancel: CancellationToken,
    progress: StepProgressHandle,
    attempt: u32,
}

impl StepContext {
    /// Create a context for the named step.
    pub fn new(step_name: &str, cancel: CancellationToken, reporter: &ProgressReporter) -> Self {
        Self {
            cancel,
            progress: reporter.for_step(step_name),
            attempt: 1,
        }
    }

    /// Same context for a later attempt.
    pub fn for_attempt(&self, attempt: u32) -> Self {
        Self {
            attempt,
            ..self.clone()
        }
    }

    /// The run's cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 1-based execution attempt (1 is the first execution).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Progress handle scoped to this step.
    pub fn progress(&self) -> &StepProgressHandle {
        &self.progress
    }
}

/// A named unit of orchestrated work with declared dependencies.
#[async_trait]
pub trait Step: Send + Sync {
    /// Stable identity of the step.
    fn name(&self) -> &str;

    /// Names of steps that must complete before this one starts.
    fn depends_on(&self) -> &[String];

    /// Run the step once.
    async fn execute(&self, ctx: &StepContext) -> Result<(), StepError>;
}

type StepFuture = Pin<Box<dyn Future<Output = Result<(), StepError>> + Send>>;
type StepAction = Arc<dyn Fn(StepContext) -> StepFuture + Send + Sync>;

/// A step built from a closure.
///
/// ```
/// use bootstep::steps::{FnStep, Step, StepError};
///
/// let step = FnStep::new("migrate", |_ctx| async { Ok::<_, StepError>(()) })
///     .depends_on(["database"]);
/// assert_eq!(step.name(), "migrate");
/// assert_eq!(Step::depends_on(&step), ["database".to_string()]);
/// ```
#[derive(Clone)]
pub struct FnStep {
    name: String,
    depends_on: Vec<String>,
    action: StepAction,
}

impl FnStep {
    /// Create a step that runs `action` on every attempt.
    pub fn new<F, Fut>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StepError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            action: Arc::new(move |ctx: StepContext| -> StepFuture { Box::pin(action(ctx)) }),
        }
    }

    /// Declare dependencies.
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Wrap into a shareable trait object.
    pub fn shared(self) -> Arc<dyn Step> {
        Arc::new(self)
    }
}

impl fmt::Debug for FnStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for FnStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    async fn execute(&self, ctx: &StepContext) -> Result<(), StepError> {
        (self.action)(ctx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_error_reports_kind_and_message() {
        let err = StepError::failed("Timeout", "no response within 5s");
        assert_eq!(err.kind(), "Timeout");
        assert_eq!(err.to_string(), "no response within 5s");
        assert!(!err.is_cancellation());
    }

    #[test]
    fn cancelled_error_is_cancellation() {
        assert!(StepError::Cancelled.is_cancellation());
        assert_eq!(StepError::Cancelled.kind(), "Cancelled");
    }

    #[test]
    fn anyhow_errors_convert() {
        let err: StepError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.kind(), "Error");
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn context_tracks_attempt() {
        let ctx = StepContext::new("a", CancellationToken::new(), &ProgressReporter::disabled());
        assert_eq!(ctx.attempt(), 1);
        assert_eq!(ctx.for_attempt(3).attempt(), 3);
    }

    #[test]
    fn context_observes_cancellation() {
        let token = CancellationToken::new();
        let ctx = StepContext::new("a", token.clone(), &ProgressReporter::disabled());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn fn_step_runs_closure() {
        let step = FnStep::new("ok", |ctx: StepContext| async move {
            if ctx.attempt() == 1 {
                Ok(())
            } else {
                Err(StepError::failed("Unexpected", "wrong attempt"))
            }
        });
        let ctx = StepContext::new("ok", CancellationToken::new(), &ProgressReporter::disabled());
        assert!(step.execute(&ctx).await.is_ok());
    }

    #[test]
    fn fn_step_collects_dependencies() {
        let step = FnStep::new("c", |_| async { Ok::<_, StepError>(()) })
            .depends_on(["a"])
            .depends_on(vec!["b".to_string()]);
        assert_eq!(Step::depends_on(&step), ["a".to_string(), "b".to_string()]);
    }
}
