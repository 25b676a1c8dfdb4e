//! Event sink trait and implementations.

use super::PipelineEvent;
use tracing::{debug, info, warn, Level};

/// Receives pipeline events.
///
/// Emission happens on the hot path of a drain, so implementations must not
/// block and must never panic.
pub trait EventSink: Send + Sync {
    /// Records an event.
    fn emit(&self, event: PipelineEvent);
}

/// A no-op event sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: PipelineEvent) {}
}

/// An event sink that logs events using the tracing framework.
///
/// Failure events are always logged at `WARN`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: PipelineEvent) {
        let stage = event.stage.as_deref().unwrap_or("-");
        let task_id = event.task_id.map(|id| id.0);

        if event.event_type.starts_with("task.") {
            warn!(
                run_id = %event.run_id,
                stage,
                task_id,
                data = %event.data,
                "Event: {}", event.event_type
            );
        } else if self.level == Level::DEBUG {
            debug!(
                run_id = %event.run_id,
                stage,
                data = %event.data,
                "Event: {}", event.event_type
            );
        } else {
            info!(
                run_id = %event.run_id,
                stage,
                data = %event.data,
                "Event: {}", event.event_type
            );
        }
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: PipelineEvent) {
        self.events.write().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskId;
    use crate::events::event_types;
    use uuid::Uuid;

    fn event(event_type: &str) -> PipelineEvent {
        PipelineEvent::new(event_type, Uuid::nil())
    }

    #[test]
    fn test_noop_and_logging_sinks_accept_events() {
        NoOpEventSink.emit(event(event_types::RUN_STARTED));

        let sink = LoggingEventSink::default();
        sink.emit(event(event_types::DRAIN_STARTED).with_stage("add"));
        sink.emit(event(event_types::TASK_FAILED).with_task(TaskId(1)));
        LoggingEventSink::debug().emit(event(event_types::RUN_COMPLETED));
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(event(event_types::RUN_STARTED));
        sink.emit(event(event_types::DRAIN_STARTED));
        sink.emit(event(event_types::DRAIN_COMPLETED));
        sink.emit(event(event_types::TASK_FAILED));

        assert_eq!(sink.len(), 4);
        assert_eq!(sink.events()[0].event_type, "pipeline.run_started");
        assert_eq!(sink.events_of_type("stage.").len(), 2);
        assert_eq!(sink.events_of_type("task.").len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}
