//! Aggregated results of one pipeline run.

use crate::core::{FailureRecord, Task, TaskId};
use crate::stages::DrainReport;
use serde::Serialize;
use uuid::Uuid;

/// Everything that happened during one call to [`super::Pipeline::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique id of the run.
    pub run_id: Uuid,
    /// The pipeline name.
    pub pipeline: String,
    /// Number of sweeps over the stage list, including the final empty one.
    pub sweeps: usize,
    /// Number of non-empty stage drains.
    pub drains: usize,
    /// Number of task executions across all stages.
    pub executed: usize,
    /// Results produced by the last stage.
    pub outputs: Vec<Task>,
    /// Transformed tasks that did not fit into their next stage.
    pub rejected: Vec<Task>,
    /// Every failed task execution.
    pub failures: Vec<FailureRecord>,
    /// Whether the run stopped because of cancellation.
    pub cancelled: bool,
    /// The cancellation reason, if cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
}

impl RunReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new(run_id: Uuid, pipeline: impl Into<String>) -> Self {
        Self {
            run_id,
            pipeline: pipeline.into(),
            sweeps: 0,
            drains: 0,
            executed: 0,
            outputs: Vec::new(),
            rejected: Vec::new(),
            failures: Vec::new(),
            cancelled: false,
            cancel_reason: None,
            duration_ms: 0.0,
        }
    }

    /// Folds one drain into the run totals.
    pub fn absorb(&mut self, drain: DrainReport) {
        self.drains += 1;
        self.executed += drain.executed;
        self.outputs.extend(drain.outputs);
        self.rejected.extend(drain.rejected);
        self.failures.extend(drain.failures);
    }

    /// Marks the run as cancelled.
    pub fn mark_cancelled(&mut self, reason: Option<String>) {
        self.cancelled = true;
        self.cancel_reason = reason;
    }

    /// Returns true if nothing failed and the run was not cancelled.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// Returns the ids of failed tasks, in the order they were recorded.
    #[must_use]
    pub fn failed_ids(&self) -> Vec<TaskId> {
        self.failures.iter().map(|f| f.task_id).collect()
    }

    /// Returns the sink output for a task, if it reached the end.
    #[must_use]
    pub fn output_for(&self, id: TaskId) -> Option<&Task> {
        self.outputs.iter().find(|t| t.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FailureKind, Payload};

    #[test]
    fn test_absorb_accumulates() {
        let mut report = RunReport::new(Uuid::nil(), "p");

        let mut first = DrainReport::new("a", 2);
        first.forwarded = vec![TaskId(1), TaskId(2)];
        report.absorb(first);

        let mut second = DrainReport::new("b", 2);
        second.outputs.push(Task::new(1, Payload::new().with("r", 1)));
        second
            .failures
            .push(FailureRecord::new("b", TaskId(2), FailureKind::Error, "bad"));
        report.absorb(second);

        assert_eq!(report.drains, 2);
        assert_eq!(report.executed, 4);
        assert_eq!(report.failed_ids(), vec![TaskId(2)]);
        assert!(report.output_for(TaskId(1)).is_some());
        assert!(report.output_for(TaskId(2)).is_none());
        assert!(!report.is_clean());
    }

    #[test]
    fn test_cancelled_is_not_clean() {
        let mut report = RunReport::new(Uuid::nil(), "p");
        assert!(report.is_clean());

        report.mark_cancelled(Some("stop".to_string()));
        assert!(!report.is_clean());
        assert_eq!(report.cancel_reason.as_deref(), Some("stop"));
    }
}
