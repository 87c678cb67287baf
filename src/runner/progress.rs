//! Step progress events and the reporter that delivers them.
//!
//! The engine emits one [`StepProgressEvent`] per lifecycle transition onto a
//! [`ProgressReporter`]. Delivery is best-effort: an observer that returns an
//! error or panics is logged and otherwise ignored, so reporting can never
//! fail a step or abort a run.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::steps::StepError;

/// Kind of lifecycle moment a progress event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    /// The step is about to run.
    Start,
    /// The step reported intermediate progress.
    Running,
    /// The step failed and will be retried after a delay.
    Retrying,
    /// The step finished successfully.
    Complete,
    /// The step failed fatally.
    Failure,
    /// Free-form informational message.
    Information,
}

impl fmt::Display for ProgressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProgressKind::Start => "start",
            ProgressKind::Running => "running",
            ProgressKind::Retrying => "retrying",
            ProgressKind::Complete => "complete",
            ProgressKind::Failure => "failure",
            ProgressKind::Information => "information",
        };
        write!(f, "{}", s)
    }
}

/// One observable moment in a step's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepProgressEvent {
    /// What happened.
    pub kind: ProgressKind,
    /// Step the event belongs to.
    pub step_name: String,
    /// Human-readable message.
    pub message: String,
    /// Completion percentage, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Additional structured details.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl StepProgressEvent {
    fn new(kind: ProgressKind, step_name: &str, message: String, percent: Option<u8>) -> Self {
        Self {
            kind,
            step_name: step_name.to_string(),
            message,
            percent,
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// Step is starting.
    pub fn start(step_name: &str) -> Self {
        Self::new(
            ProgressKind::Start,
            step_name,
            format!("Starting step '{}'...", step_name),
            Some(0),
        )
    }

    /// Intermediate progress reported by the step itself.
    pub fn running(step_name: &str, message: impl Into<String>, percent: Option<u8>) -> Self {
        Self::new(
            ProgressKind::Running,
            step_name,
            message.into(),
            percent.map(|p| p.min(100)),
        )
    }

    /// Step failed and is waiting `delay` before attempt `attempt` of `max_attempts`.
    pub fn retrying(step_name: &str, attempt: u32, max_attempts: u32, delay: Duration) -> Self {
        let seconds = delay.as_secs_f64();
        Self::new(
            ProgressKind::Retrying,
            step_name,
            format!(
                "Retrying step '{}' (attempt {}/{}) in {:.2}s",
                step_name, attempt, max_attempts, seconds
            ),
            None,
        )
        .with_metadata("attempt", attempt)
        .with_metadata("max_attempts", max_attempts)
        .with_metadata("delay_seconds", seconds)
    }

    /// Step finished successfully.
    pub fn complete(step_name: &str) -> Self {
        Self::new(
            ProgressKind::Complete,
            step_name,
            format!("Step '{}' completed.", step_name),
            Some(100),
        )
    }

    /// Step failed fatally.
    pub fn failure(step_name: &str, error: Option<&StepError>) -> Self {
        let message = match error {
            Some(err) => format!("Step '{}' failed: {}", step_name, err),
            None => format!("Step '{}' failed.", step_name),
        };
        let event = Self::new(ProgressKind::Failure, step_name, message, None);
        match error {
            Some(err) => event
                .with_metadata("error_message", err.to_string())
                .with_metadata("error_kind", err.kind()),
            None => event,
        }
    }

    /// Free-form informational message.
    pub fn information(step_name: &str, message: impl Into<String>) -> Self {
        Self::new(ProgressKind::Information, step_name, message.into(), None)
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Receives progress events.
///
/// Implementations should return quickly; they are called inline from the
/// step task that produced the event.
pub trait ProgressObserver: Send + Sync {
    /// Handle one event. Errors are logged and dropped by the reporter.
    fn on_event(&self, event: &StepProgressEvent) -> anyhow::Result<()>;
}

impl<T: ProgressObserver + ?Sized> ProgressObserver for Arc<T> {
    fn on_event(&self, event: &StepProgressEvent) -> anyhow::Result<()> {
        (**self).on_event(event)
    }
}

impl ProgressObserver for mpsc::UnboundedSender<StepProgressEvent> {
    fn on_event(&self, event: &StepProgressEvent) -> anyhow::Result<()> {
        self.send(event.clone())
            .map_err(|_| anyhow::anyhow!("progress receiver was dropped"))
    }
}

/// Adapts a closure into a [`ProgressObserver`].
pub struct FnObserver<F>(pub F);

impl<F> ProgressObserver for FnObserver<F>
where
    F: Fn(&StepProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &StepProgressEvent) -> anyhow::Result<()> {
        (self.0)(event);
        Ok(())
    }
}

/// Writes every event to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_event(&self, event: &StepProgressEvent) -> anyhow::Result<()> {
        match event.kind {
            ProgressKind::Failure => warn!(step = %event.step_name, "{}", event.message),
            ProgressKind::Retrying => warn!(step = %event.step_name, "{}", event.message),
            ProgressKind::Running | ProgressKind::Information => {
                debug!(step = %event.step_name, percent = ?event.percent, "{}", event.message)
            }
            ProgressKind::Start | ProgressKind::Complete => {
                info!(step = %event.step_name, "{}", event.message)
            }
        }
        Ok(())
    }
}

/// Fans progress events out to zero or more observers.
///
/// Cloning is cheap; all clones share the same observers.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ProgressReporter {
    /// Reporter that drops every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Reporter delivering to a single observer.
    pub fn new(observer: impl ProgressObserver + 'static) -> Self {
        Self::disabled().with_observer(observer)
    }

    /// Reporter delivering to a closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&StepProgressEvent) + Send + Sync + 'static,
    {
        Self::new(FnObserver(f))
    }

    /// Reporter paired with an unbounded channel receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StepProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Add another observer.
    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Whether any observer is attached.
    pub fn is_enabled(&self) -> bool {
        !self.observers.is_empty()
    }

    /// Deliver an event to every observer.
    pub fn emit(&self, event: StepProgressEvent) {
        for observer in &self.observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_event(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(step = %event.step_name, kind = %event.kind, "Progress observer failed: {e:#}")
                }
                Err(_) => {
                    debug!(step = %event.step_name, kind = %event.kind, "Progress observer panicked")
                }
            }
        }
    }

    pub fn start(&self, step_name: &str) {
        self.emit(StepProgressEvent::start(step_name));
    }

    pub fn running(&self, step_name: &str, message: impl Into<String>, percent: Option<u8>) {
        self.emit(StepProgressEvent::running(step_name, message, percent));
    }

    pub fn retrying(&self, step_name: &str, attempt: u32, max_attempts: u32, delay: Duration) {
        self.emit(StepProgressEvent::retrying(
            step_name,
            attempt,
            max_attempts,
            delay,
        ));
    }

    pub fn complete(&self, step_name: &str) {
        self.emit(StepProgressEvent::complete(step_name));
    }

    pub fn failure(&self, step_name: &str, error: Option<&StepError>) {
        self.emit(StepProgressEvent::failure(step_name, error));
    }

    pub fn information(&self, step_name: &str, message: impl Into<String>) {
        self.emit(StepProgressEvent::information(step_name, message));
    }

    /// Handle that reports on behalf of one step.
    pub fn for_step(&self, step_name: &str) -> StepProgressHandle {
        StepProgressHandle {
            reporter: self.clone(),
            step_name: step_name.to_string(),
        }
    }
}

/// Progress handle given to a running step.
#[derive(Debug, Clone)]
pub struct StepProgressHandle {
    reporter: ProgressReporter,
    step_name: String,
}

impl StepProgressHandle {
    /// Report intermediate progress.
    pub fn running(&self, message: impl Into<String>, percent: Option<u8>) {
        self.reporter.running(&self.step_name, message, percent);
    }

    /// Report an informational message.
    pub fn information(&self, message: impl Into<String>) {
        self.reporter.information(&self.step_name, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn start_event_has_zero_percent_and_default_message() {
        let event = StepProgressEvent::start("database");
        assert_eq!(event.kind, ProgressKind::Start);
        assert_eq!(event.percent, Some(0));
        assert_eq!(event.message, "Starting step 'database'...");
    }

    #[test]
    fn complete_event_has_full_percent() {
        let event = StepProgressEvent::complete("database");
        assert_eq!(event.percent, Some(100));
        assert_eq!(event.message, "Step 'database' completed.");
    }

    #[test]
    fn running_percent_is_capped() {
        let event = StepProgressEvent::running("seed", "loading fixtures", Some(150));
        assert_eq!(event.percent, Some(100));
        assert_eq!(event.message, "loading fixtures");
    }

    #[test]
    fn information_has_no_percent() {
        let event = StepProgressEvent::information("seed", "using cached fixtures");
        assert_eq!(event.kind, ProgressKind::Information);
        assert!(event.percent.is_none());
    }

    #[test]
    fn retrying_event_carries_attempt_metadata() {
        let event = StepProgressEvent::retrying("cache", 2, 5, Duration::from_millis(1500));
        assert_eq!(event.kind, ProgressKind::Retrying);
        assert_eq!(event.metadata["attempt"], Value::from(2));
        assert_eq!(event.metadata["max_attempts"], Value::from(5));
        assert_eq!(event.metadata["delay_seconds"], Value::from(1.5));
        assert!(event.message.contains("attempt 2/5"));
        assert!(event.message.contains("1.50s"));
    }

    #[test]
    fn failure_event_carries_error_details() {
        let err = StepError::failed("ExitStatus", "exited with code 3");
        let event = StepProgressEvent::failure("build", Some(&err));
        assert_eq!(event.metadata["error_kind"], Value::from("ExitStatus"));
        assert_eq!(
            event.metadata["error_message"],
            Value::from("exited with code 3")
        );
    }

    #[test]
    fn failure_event_without_error_has_no_metadata() {
        let event = StepProgressEvent::failure("build", None);
        assert!(event.metadata.is_empty());
    }

    #[test]
    fn events_serialize_with_snake_case_kind() {
        let json = serde_json::to_value(StepProgressEvent::start("a")).unwrap();
        assert_eq!(json["kind"], "start");
        assert_eq!(json["step_name"], "a");
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn reporter_delivers_to_closure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ProgressReporter::from_fn(move |e| sink.lock().unwrap().push(e.kind));

        reporter.start("a");
        reporter.complete("a");

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ProgressKind::Start, ProgressKind::Complete]
        );
    }

    #[test]
    fn reporter_swallows_observer_panics() {
        let reporter = ProgressReporter::from_fn(|_| panic!("observer exploded"));
        reporter.start("a");
        reporter.complete("a");
    }

    #[test]
    fn reporter_swallows_dropped_channel() {
        let (reporter, rx) = ProgressReporter::channel();
        drop(rx);
        reporter.start("a");
    }

    #[test]
    fn failing_observer_does_not_starve_others() {
        struct Failing;
        impl ProgressObserver for Failing {
            fn on_event(&self, _event: &StepProgressEvent) -> anyhow::Result<()> {
                anyhow::bail!("sink unavailable")
            }
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(Failing).with_observer(tx);
        reporter.information("a", "hello");

        assert_eq!(rx.try_recv().unwrap().message, "hello");
    }

    #[test]
    fn step_handle_reports_under_step_name() {
        let (reporter, mut rx) = ProgressReporter::channel();
        let handle = reporter.for_step("migrate");
        handle.running("halfway", Some(50));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.step_name, "migrate");
        assert_eq!(event.percent, Some(50));
    }

    #[test]
    fn disabled_reporter_is_not_enabled() {
        assert!(!ProgressReporter::disabled().is_enabled());
    }
}
