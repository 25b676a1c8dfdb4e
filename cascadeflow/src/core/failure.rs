//! Per-task failure records.

use super::TaskId;
use crate::errors::StageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a task did not make it to the next stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The transform returned an error.
    Error,
    /// The transform panicked.
    Panic,
    /// The transform exceeded its timeout.
    Timeout,
    /// The run was cancelled while the task was in flight.
    Cancelled,
    /// The transform succeeded but the next stage was full.
    ForwardRejected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Panic => write!(f, "panic"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::ForwardRejected => write!(f, "forward_rejected"),
        }
    }
}

/// Record of a single failed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Stage where the failure happened.
    pub stage: String,
    /// The failed task.
    pub task_id: TaskId,
    /// Failure classification.
    pub kind: FailureKind,
    /// Human-readable error message.
    pub error: String,
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
}

impl FailureRecord {
    /// Creates a new failure record.
    #[must_use]
    pub fn new(
        stage: impl Into<String>,
        task_id: TaskId,
        kind: FailureKind,
        error: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            task_id,
            kind,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    /// Returns true if resubmitting the task could succeed.
    ///
    /// Rejections and cancellations depend on pipeline state, not on the
    /// payload.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind,
            FailureKind::ForwardRejected | FailureKind::Cancelled | FailureKind::Timeout
        )
    }
}

impl From<&StageError> for FailureRecord {
    fn from(err: &StageError) -> Self {
        let kind = match err {
            StageError::Transform { .. } | StageError::Lost { .. } => FailureKind::Error,
            StageError::Panicked { .. } => FailureKind::Panic,
            StageError::Timeout { .. } => FailureKind::Timeout,
            StageError::Cancelled { .. } => FailureKind::Cancelled,
            StageError::ForwardRejected { .. } => FailureKind::ForwardRejected,
        };
        Self::new(err.stage(), err.task_id(), kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_record_creation() {
        let record = FailureRecord::new("add", TaskId(3), FailureKind::Error, "boom");

        assert_eq!(record.stage, "add");
        assert_eq!(record.task_id, TaskId(3));
        assert_eq!(record.kind, FailureKind::Error);
        assert_eq!(record.error, "boom");
        assert!(!record.is_recoverable());
    }

    #[test]
    fn test_rejections_are_recoverable() {
        let record = FailureRecord::new("s", TaskId(1), FailureKind::ForwardRejected, "full");
        assert!(record.is_recoverable());
    }

    #[test]
    fn test_from_stage_error() {
        let err = StageError::Panicked {
            stage: "print".to_string(),
            task_id: TaskId(2),
            message: "oops".to_string(),
        };
        let record = FailureRecord::from(&err);

        assert_eq!(record.kind, FailureKind::Panic);
        assert_eq!(record.stage, "print");
        assert_eq!(record.task_id, TaskId(2));
        assert!(record.error.contains("oops"));
    }

    #[test]
    fn test_failure_kind_serialize() {
        let json = serde_json::to_string(&FailureKind::ForwardRejected).unwrap();
        assert_eq!(json, r#""forward_rejected""#);
    }
}
