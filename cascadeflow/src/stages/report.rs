//! Results of one stage drain.

use crate::core::{FailureRecord, Task, TaskId, TaskOutcome};
use serde::Serialize;

/// What happened to the batch swapped out by one drain.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrainReport {
    /// The drained stage.
    pub stage: String,
    /// Number of tasks in the batch.
    pub executed: usize,
    /// Tasks whose results entered the next stage.
    pub forwarded: Vec<TaskId>,
    /// Results of the last stage, which are not forwarded anywhere.
    pub outputs: Vec<Task>,
    /// Transformed tasks the next stage had no room for.
    pub rejected: Vec<Task>,
    /// One record per failed task.
    pub failures: Vec<FailureRecord>,
}

impl DrainReport {
    /// Creates an empty report for a batch of `executed` tasks.
    #[must_use]
    pub fn new(stage: impl Into<String>, executed: usize) -> Self {
        Self {
            stage: stage.into(),
            executed,
            ..Self::default()
        }
    }

    /// Returns the number of tasks that completed successfully.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.forwarded.len() + self.outputs.len()
    }

    /// Returns true if every task in the batch succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns true if the batch was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executed == 0
    }

    /// Returns what happened to a task of this batch.
    ///
    /// A forward rejection counts as a failure.
    #[must_use]
    pub fn outcome(&self, id: TaskId) -> Option<TaskOutcome> {
        if self.failures.iter().any(|f| f.task_id == id) {
            Some(TaskOutcome::Failed)
        } else if self.forwarded.contains(&id) {
            Some(TaskOutcome::Forwarded)
        } else if self.outputs.iter().any(|t| t.id() == id) {
            Some(TaskOutcome::Sunk)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FailureKind, Payload};

    #[test]
    fn test_counts() {
        let mut report = DrainReport::new("s", 3);
        report.forwarded.push(TaskId(1));
        report.outputs.push(Task::new(2, Payload::new()));
        report
            .failures
            .push(FailureRecord::new("s", TaskId(3), FailureKind::Error, "x"));

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.outcome(TaskId(1)), Some(TaskOutcome::Forwarded));
        assert_eq!(report.outcome(TaskId(2)), Some(TaskOutcome::Sunk));
        assert_eq!(report.outcome(TaskId(3)), Some(TaskOutcome::Failed));
        assert_eq!(report.outcome(TaskId(4)), None);
        assert!(!report.is_clean());
        assert!(!report.is_empty());
    }

    #[test]
    fn test_empty_report() {
        let report = DrainReport::new("s", 0);
        assert!(report.is_empty());
        assert!(report.is_clean());
    }
}
