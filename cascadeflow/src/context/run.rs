//! The context handed to every stage drain of a run.

use crate::cancellation::CancellationToken;
use crate::core::TaskId;
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Everything a stage needs from the run driving it.
///
/// Cheap to clone: all shared parts are reference counted.
#[derive(Clone)]
pub struct RunContext {
    run_id: Uuid,
    cancel: Arc<CancellationToken>,
    events: Arc<dyn EventSink>,
    default_timeout: Option<Duration>,
}

impl RunContext {
    /// Creates a context with a fresh run id, no timeout and a no-op sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            cancel: Arc::new(CancellationToken::new()),
            events: Arc::new(NoOpEventSink),
            default_timeout: None,
        }
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: Arc<CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the timeout applied to tasks of stages without their own.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancel
    }

    /// Returns true if the run has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns the fallback task timeout.
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Emits a run-level event.
    pub fn emit(&self, event_type: &str, data: serde_json::Value) {
        self.events
            .emit(PipelineEvent::new(event_type, self.run_id).with_data(data));
    }

    /// Emits a stage-level event.
    pub fn emit_stage(&self, event_type: &str, stage: &str, data: serde_json::Value) {
        self.events.emit(
            PipelineEvent::new(event_type, self.run_id)
                .with_stage(stage)
                .with_data(data),
        );
    }

    /// Emits a task-level event.
    pub fn emit_task(&self, event_type: &str, stage: &str, task_id: TaskId, data: serde_json::Value) {
        self.events.emit(
            PipelineEvent::new(event_type, self.run_id)
                .with_stage(stage)
                .with_task(task_id)
                .with_data(data),
        );
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("cancelled", &self.is_cancelled())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{event_types, CollectingEventSink};

    #[test]
    fn test_emit_stamps_run_id() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = RunContext::new().with_event_sink(sink.clone());

        ctx.emit_task(event_types::TASK_FAILED, "add", TaskId(2), serde_json::json!({}));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].run_id, ctx.run_id());
        assert_eq!(events[0].task_id, Some(TaskId(2)));
        assert_eq!(events[0].stage.as_deref(), Some("add"));
    }

    #[test]
    fn test_shared_cancellation() {
        let token = Arc::new(CancellationToken::new());
        let ctx = RunContext::new().with_cancellation(token.clone());
        let copy = ctx.clone();

        token.cancel("stop");
        assert!(ctx.is_cancelled());
        assert!(copy.is_cancelled());
    }
}
