//! Level-by-level execution of a step set.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{BootstepError, Result};
use crate::steps::{Step, StepContext, StepError};

use super::dependency::{ExecutionGraph, ExecutionLevel};
use super::progress::ProgressReporter;
use super::retry::{RetryPipeline, RetryPolicy};

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Validating,
    Running,
    /// Every step finished successfully.
    Completed,
    /// The graph was invalid or a step failed fatally.
    Failed,
    /// Cancellation was requested.
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::NotStarted => "not started",
            RunState::Validating => "validating",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
            RunState::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}

/// Final status of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Failed,
    Cancelled,
}

impl StepStatus {
    /// Get a display character for this status.
    pub fn display_char(&self) -> char {
        match self {
            StepStatus::Completed => '✓',
            StepStatus::Failed => '✗',
            StepStatus::Cancelled => '⊘',
        }
    }
}

/// What happened to one step during a run.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub name: String,
    pub level: usize,
    pub status: StepStatus,
    /// Executions performed, including the first.
    pub attempts: u32,
    pub duration: Duration,
}

impl StepReport {
    /// Generate a summary line for display.
    pub fn summary_line(&self) -> String {
        let retries = if self.attempts > 1 {
            format!(", {} attempts", self.attempts)
        } else {
            String::new()
        };
        format!(
            "{} {} ({}{})",
            self.status.display_char(),
            self.name,
            format_duration(self.duration),
            retries
        )
    }
}

/// The step that ended a run.
#[derive(Debug)]
pub struct StepFailure {
    pub step: String,
    pub level: usize,
    pub attempts: u32,
    pub error: StepError,
    /// Steps that depend on the failed step, directly or indirectly.
    pub blocked: Vec<String>,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Step '{}' (level {}) failed after {} attempt(s): {}",
            self.step, self.level, self.attempts, self.error
        )
    }
}

/// Result of running a step set.
#[derive(Debug)]
pub struct RunResult {
    /// `Completed` or `Failed`.
    pub state: RunState,
    /// Levels that finished with every step successful.
    pub levels_completed: usize,
    /// Total number of levels in the graph.
    pub level_count: usize,
    /// Reports for every step that was started, in level then input order.
    pub steps: Vec<StepReport>,
    /// Steps never attempted because an earlier level failed.
    pub skipped: Vec<String>,
    /// The fatal failure, if any.
    pub failure: Option<StepFailure>,
    pub duration: Duration,
}

impl RunResult {
    /// Whether every step completed.
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}

struct StepOutcome {
    report: StepReport,
    error: Option<StepError>,
}

/// Runs a step set level by level with retries and progress reporting.
///
/// ```no_run
/// use bootstep::runner::{ExecutionEngine, RetryPolicy};
/// use bootstep::steps::{FnStep, StepError};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn demo() -> bootstep::Result<()> {
/// let engine = ExecutionEngine::new().with_default_policy(RetryPolicy::none());
/// let steps = vec![
///     FnStep::new("database", |_| async { Ok::<_, StepError>(()) }).shared(),
///     FnStep::new("migrate", |_| async { Ok::<_, StepError>(()) })
///         .depends_on(["database"])
///         .shared(),
/// ];
/// let result = engine.run(steps, CancellationToken::new()).await?;
/// assert!(result.success());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExecutionEngine {
    default_policy: RetryPolicy,
    policies: HashMap<String, RetryPolicy>,
    reporter: ProgressReporter,
}

impl ExecutionEngine {
    /// Engine with the default retry policy and no progress observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy used by steps without their own.
    pub fn with_default_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Register a policy for one step.
    pub fn with_step_policy(mut self, step: impl Into<String>, policy: RetryPolicy) -> Self {
        self.policies.insert(step.into(), policy);
        self
    }

    /// Send progress events to `reporter`.
    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Policy applied to `step`.
    pub fn policy_for(&self, step: &str) -> &RetryPolicy {
        self.policies.get(step).unwrap_or(&self.default_policy)
    }

    /// Run every step, honouring dependencies.
    ///
    /// Graph validation errors and cancellation are returned as `Err`;
    /// a step that fails fatally is reported in the `Ok` result.
    pub async fn run(
        &self,
        steps: Vec<Arc<dyn Step>>,
        cancel: CancellationToken,
    ) -> Result<RunResult> {
        let start = Instant::now();
        let mut state = RunState::NotStarted;
        debug!(state = %state, steps = steps.len(), "Preparing run");

        state = RunState::Validating;
        debug!(state = %state, "Building execution graph");
        let graph = match ExecutionGraph::create(&steps) {
            Ok(graph) => graph,
            Err(e) => {
                warn!(state = %RunState::Failed, "Step graph is invalid: {}", e);
                return Err(e);
            }
        };

        state = RunState::Running;
        debug!(
            state = %state,
            levels = graph.level_count(),
            steps = graph.step_count(),
            "Execution graph built"
        );

        let mut reports = Vec::with_capacity(graph.step_count());

        for level in graph.levels() {
            if cancel.is_cancelled() {
                return Err(self.abort(level.index()));
            }

            debug!(level = level.index(), steps = level.len(), "Executing level");
            for step in level.steps() {
                self.reporter.start(step.name());
            }

            let outcomes = self.run_level(level, &cancel).await;
            let mut failure = None;
            let mut cancelled = false;

            for (step, outcome) in level.steps().iter().zip(outcomes) {
                match outcome.error {
                    Some(error) if error.is_cancellation() => cancelled = true,
                    Some(error) if failure.is_none() => {
                        failure = Some(StepFailure {
                            step: step.name().to_string(),
                            level: level.index(),
                            attempts: outcome.report.attempts,
                            error,
                            blocked: graph.blocked_by(step.name()),
                        });
                    }
                    _ => {}
                }
                reports.push(outcome.report);
            }

            if cancelled {
                return Err(self.abort(level.index()));
            }

            if let Some(failure) = failure {
                warn!(
                    state = %RunState::Failed,
                    step = %failure.step,
                    level = failure.level,
                    "{}", failure
                );
                let skipped = graph.levels()[level.index() + 1..]
                    .iter()
                    .flat_map(|l| l.names())
                    .map(str::to_string)
                    .collect();
                return Ok(RunResult {
                    state: RunState::Failed,
                    levels_completed: level.index(),
                    level_count: graph.level_count(),
                    steps: reports,
                    skipped,
                    failure: Some(failure),
                    duration: start.elapsed(),
                });
            }

            debug!(level = level.index(), "Level succeeded");
        }

        debug!(
            state = %RunState::Completed,
            duration_ms = start.elapsed().as_millis() as u64,
            "All steps completed"
        );

        Ok(RunResult {
            state: RunState::Completed,
            levels_completed: graph.level_count(),
            level_count: graph.level_count(),
            steps: reports,
            skipped: Vec::new(),
            failure: None,
            duration: start.elapsed(),
        })
    }

    fn abort(&self, levels_completed: usize) -> BootstepError {
        warn!(state = %RunState::Aborted, levels_completed, "Run cancelled");
        BootstepError::Aborted { levels_completed }
    }

    /// Run every step of `level` concurrently and wait for all of them.
    ///
    /// Outcomes are returned in the level's step order. Siblings of a failing
    /// step are allowed to finish.
    async fn run_level(
        &self,
        level: &ExecutionLevel,
        cancel: &CancellationToken,
    ) -> Vec<StepOutcome> {
        let mut tasks = JoinSet::new();

        for (position, step) in level.steps().iter().enumerate() {
            let step = Arc::clone(step);
            let pipeline = self.pipeline_for(step.name());
            let reporter = self.reporter.clone();
            let cancel = cancel.clone();
            let index = level.index();

            tasks.spawn(async move {
                let outcome = execute_step(step, index, pipeline, reporter, cancel).await;
                (position, outcome)
            });
        }

        let mut slots: Vec<Option<StepOutcome>> = (0..level.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, outcome)) => slots[position] = Some(outcome),
                Err(e) => debug!(level = level.index(), "Step task ended abnormally: {}", e),
            }
        }

        // A missing slot means the step's task panicked.
        level
            .steps()
            .iter()
            .zip(slots)
            .map(|(step, slot)| {
                slot.unwrap_or_else(|| {
                    let error = StepError::failed("Panic", "step panicked during execution");
                    self.reporter.failure(step.name(), Some(&error));
                    StepOutcome {
                        report: StepReport {
                            name: step.name().to_string(),
                            level: level.index(),
                            status: StepStatus::Failed,
                            attempts: 1,
                            duration: Duration::ZERO,
                        },
                        error: Some(error),
                    }
                })
            })
            .collect()
    }

    fn pipeline_for(&self, step: &str) -> RetryPipeline {
        let mut pipeline = RetryPipeline::create(step, self.policy_for(step));
        let reporter = self.reporter.clone();
        pipeline.subscribe(move |event| {
            reporter.retrying(
                event.step_name,
                event.attempt,
                event.max_attempts,
                event.delay,
            );
        });
        pipeline
    }
}

async fn execute_step(
    step: Arc<dyn Step>,
    level: usize,
    pipeline: RetryPipeline,
    reporter: ProgressReporter,
    cancel: CancellationToken,
) -> StepOutcome {
    let started = Instant::now();
    let ctx = StepContext::new(step.name(), cancel.clone(), &reporter);

    let execution = {
        let step = &step;
        let ctx = &ctx;
        pipeline
            .execute(&cancel, move |attempt| {
                let ctx = ctx.for_attempt(attempt);
                async move { step.execute(&ctx).await }
            })
            .await
    };

    let duration = started.elapsed();
    let (status, error) = match execution.result {
        Ok(()) => {
            debug!(step = step.name(), attempts = execution.attempts, "Step completed");
            reporter.complete(step.name());
            (StepStatus::Completed, None)
        }
        Err(error) if error.is_cancellation() => {
            debug!(step = step.name(), "Step cancelled");
            (StepStatus::Cancelled, Some(error))
        }
        Err(error) => {
            reporter.failure(step.name(), Some(&error));
            (StepStatus::Failed, Some(error))
        }
    };

    StepOutcome {
        report: StepReport {
            name: step.name().to_string(),
            level,
            status,
            attempts: execution.attempts,
            duration,
        },
        error,
    }
}

/// Format a duration for display.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{}s", secs, millis / 100)
    } else {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}
