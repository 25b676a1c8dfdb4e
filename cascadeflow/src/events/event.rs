//! Structured pipeline events.

use crate::core::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known event type names.
pub mod event_types {
    /// A run began sweeping.
    pub const RUN_STARTED: &str = "pipeline.run_started";
    /// A run reached its fixed point or stopped.
    pub const RUN_COMPLETED: &str = "pipeline.run_completed";
    /// A run observed cancellation and stopped sweeping.
    pub const CANCELLED: &str = "pipeline.cancelled";
    /// A stage swapped out a batch.
    pub const DRAIN_STARTED: &str = "stage.drain_started";
    /// Every unit of a batch finished.
    pub const DRAIN_COMPLETED: &str = "stage.drain_completed";
    /// A task failed inside a stage.
    pub const TASK_FAILED: &str = "task.failed";
    /// A transformed task did not fit into the next stage.
    pub const TASK_FORWARD_REJECTED: &str = "task.forward_rejected";
}

/// One observable occurrence during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// The event type (see [`event_types`]).
    pub event_type: String,
    /// The run the event belongs to.
    pub run_id: Uuid,
    /// The stage involved, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// The task involved, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    /// Event-specific data.
    #[serde(default)]
    pub data: serde_json::Value,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(event_type: impl Into<String>, run_id: Uuid) -> Self {
        Self {
            event_type: event_type.into(),
            run_id,
            stage: None,
            task_id: None,
            data: serde_json::Value::Null,
            timestamp: Utc::now(),
        }
    }

    /// Sets the stage.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Sets the task.
    #[must_use]
    pub fn with_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Sets the data.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let run_id = Uuid::new_v4();
        let event = PipelineEvent::new(event_types::TASK_FAILED, run_id)
            .with_stage("add")
            .with_task(TaskId(3))
            .with_data(serde_json::json!({"error": "boom"}));

        assert_eq!(event.event_type, "task.failed");
        assert_eq!(event.run_id, run_id);
        assert_eq!(event.stage.as_deref(), Some("add"));
        assert_eq!(event.task_id, Some(TaskId(3)));
        assert_eq!(event.data["error"], "boom");
    }

    #[test]
    fn test_event_serialization_skips_empty_fields() {
        let event = PipelineEvent::new(event_types::RUN_STARTED, Uuid::nil());
        let json = serde_json::to_value(&event).unwrap();

        assert!(json.get("stage").is_none());
        assert!(json.get("task_id").is_none());
        assert_eq!(json["event_type"], "pipeline.run_started");
    }
}
