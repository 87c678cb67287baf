//! Retry policies and the pipeline that applies them to a step.
//!
//! A [`RetryPolicy`] describes how a failing step is retried. The
//! [`RetryPipeline`] built from it executes an operation, sleeps between
//! attempts according to the backoff strategy, and announces every retry as
//! a [`RetryEvent`] to its subscribers (telemetry, progress, user callback).

use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::steps::StepError;

/// Lower bound of the jitter factor.
pub const JITTER_MIN: f64 = 0.85;

/// Upper bound of the jitter factor.
pub const JITTER_MAX: f64 = 1.15;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay every time.
    Constant,
    /// `initial_delay × attempt`.
    Linear,
    /// `initial_delay × 2^(attempt - 1)`.
    #[default]
    Exponential,
}

impl fmt::Display for BackoffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackoffKind::Constant => "constant",
            BackoffKind::Linear => "linear",
            BackoffKind::Exponential => "exponential",
        };
        write!(f, "{}", s)
    }
}

/// Details of one scheduled retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryEvent<'a> {
    /// Step being retried.
    pub step_name: &'a str,
    /// 1-based retry number.
    pub attempt: u32,
    /// Configured retry budget.
    pub max_attempts: u32,
    /// Delay before the retry runs.
    pub delay: Duration,
    /// Error that triggered the retry.
    pub error: &'a StepError,
}

/// Decides whether an error is worth retrying.
pub type RetryPredicate = Arc<dyn Fn(&StepError) -> bool + Send + Sync>;

/// Receives every [`RetryEvent`].
pub type RetryCallback = Arc<dyn Fn(&RetryEvent<'_>) + Send + Sync>;

/// Retry configuration for a step.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the first execution. `0` disables retrying.
    pub max_attempts: u32,
    /// Delay growth strategy.
    pub backoff: BackoffKind,
    /// Base delay.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Randomize delays by ±15%.
    pub use_jitter: bool,
    /// Custom retry decision; by default everything but cancellation is retried.
    pub retry_predicate: Option<RetryPredicate>,
    /// Called on every retry.
    pub on_retry: Option<RetryCallback>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffKind::Exponential,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            use_jitter: true,
            retry_predicate: None,
            on_retry: None,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("use_jitter", &self.use_jitter)
            .field("retry_predicate", &self.retry_predicate.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffKind) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Only retry errors accepted by `predicate`.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&StepError) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Call `callback` on every retry.
    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RetryEvent<'_>) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    /// Whether this policy ever retries.
    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Delay for retry `attempt` (1-based) before jitter and clamping.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self.backoff {
            BackoffKind::Constant => self.initial_delay,
            BackoffKind::Linear => self.initial_delay.saturating_mul(attempt),
            BackoffKind::Exponential => self
                .initial_delay
                .saturating_mul(2u32.saturating_pow(attempt - 1)),
        }
    }

    /// Delay actually waited before retry `attempt`, jittered and clamped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let delay = if self.use_jitter {
            let factor = rand::rng().random_range(JITTER_MIN..=JITTER_MAX);
            scale(base, factor)
        } else {
            base
        };
        delay.min(self.max_delay)
    }

    /// Whether `error` may be retried under this policy.
    pub fn should_retry(&self, error: &StepError) -> bool {
        if error.is_cancellation() {
            return false;
        }
        match &self.retry_predicate {
            Some(predicate) => predicate(error),
            None => true,
        }
    }
}

fn scale(duration: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(duration.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

/// Outcome of running an operation through a [`RetryPipeline`].
#[derive(Debug)]
pub struct Execution {
    /// How many times the operation was executed.
    pub attempts: u32,
    /// Result of the last execution, or `Cancelled` if a retry wait was interrupted.
    pub result: Result<(), StepError>,
}

/// Executes an operation under a step's retry policy.
#[derive(Clone)]
pub struct RetryPipeline {
    step_name: String,
    policy: Option<RetryPolicy>,
    subscribers: Vec<RetryCallback>,
}

impl fmt::Debug for RetryPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPipeline")
            .field("step_name", &self.step_name)
            .field("policy", &self.policy)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl RetryPipeline {
    /// Build the pipeline for `step_name`.
    ///
    /// A policy with `max_attempts == 0` produces a no-op pipeline that runs
    /// the operation once and never notifies subscribers.
    pub fn create(step_name: &str, policy: &RetryPolicy) -> Self {
        if !policy.is_enabled() {
            return Self::noop(step_name);
        }

        let mut subscribers: Vec<RetryCallback> = vec![Arc::new(log_retry)];
        if let Some(callback) = &policy.on_retry {
            subscribers.push(Arc::clone(callback));
        }

        Self {
            step_name: step_name.to_string(),
            policy: Some(policy.clone()),
            subscribers,
        }
    }

    /// Pipeline that executes once.
    pub fn noop(step_name: &str) -> Self {
        Self {
            step_name: step_name.to_string(),
            policy: None,
            subscribers: Vec::new(),
        }
    }

    /// Whether this pipeline never retries.
    pub fn is_noop(&self) -> bool {
        self.policy.is_none()
    }

    /// Add a retry subscriber. Ignored by no-op pipelines.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: Fn(&RetryEvent<'_>) + Send + Sync + 'static,
    {
        if self.policy.is_some() {
            self.subscribers.push(Arc::new(callback));
        }
    }

    /// Run `operation` until it succeeds, the policy gives up, or `cancel` fires.
    ///
    /// `operation` receives the 1-based execution number.
    pub async fn execute<F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> Execution
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), StepError>>,
    {
        let mut attempts = 0;

        loop {
            if cancel.is_cancelled() {
                return Execution {
                    attempts,
                    result: Err(StepError::Cancelled),
                };
            }

            attempts += 1;
            let error = match operation(attempts).await {
                Ok(()) => {
                    return Execution {
                        attempts,
                        result: Ok(()),
                    }
                }
                Err(error) => error,
            };

            let Some(policy) = &self.policy else {
                return Execution {
                    attempts,
                    result: Err(error),
                };
            };

            // The retry number equals the executions so far.
            let retry = attempts;
            if retry > policy.max_attempts || !policy.should_retry(&error) {
                return Execution {
                    attempts,
                    result: Err(error),
                };
            }

            let delay = policy.delay_for_attempt(retry);
            let event = RetryEvent {
                step_name: &self.step_name,
                attempt: retry,
                max_attempts: policy.max_attempts,
                delay,
                error: &error,
            };
            for subscriber in &self.subscribers {
                if catch_unwind(AssertUnwindSafe(|| subscriber(&event))).is_err() {
                    debug!(step = %self.step_name, attempt = retry, "Retry subscriber panicked");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Execution {
                        attempts,
                        result: Err(StepError::Cancelled),
                    };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn log_retry(event: &RetryEvent<'_>) {
    warn!(
        step = event.step_name,
        attempt = event.attempt,
        max_attempts = event.max_attempts,
        delay_ms = event.delay.as_millis() as u64,
        error_kind = event.error.kind(),
        "Retrying step after error: {}",
        event.error
    );
}
