//! Error types for the cascadeflow engine.
//!
//! Admission failures are plain values (`bool` / `Err(Task)`); everything
//! else that can go wrong is described here.

use crate::core::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for cascadeflow operations.
#[derive(Debug, Error)]
pub enum CascadeError {
    /// A pipeline could not be constructed.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A task was refused because every eligible stage is full.
    #[error("Task {task_id} rejected: no stage capacity (admitted {admitted} before rejection)")]
    AdmissionRejected {
        /// The rejected task.
        task_id: TaskId,
        /// How many tasks of the batch were admitted before the rejection.
        admitted: usize,
    },

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Metadata about a construction error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CASCADE-EMPTY").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a pipeline is built from an invalid stage list.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// A payload did not have the shape a transform expected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// A required key is absent.
    #[error("missing key '{key}'")]
    MissingKey {
        /// The missing key.
        key: String,
    },

    /// A key holds a value of the wrong kind.
    #[error("key '{key}' expected {expected}, found {found}")]
    WrongKind {
        /// The offending key.
        key: String,
        /// The expected value kind.
        expected: &'static str,
        /// The kind actually found.
        found: &'static str,
    },

    /// A JSON value that is not an object was used as a payload.
    #[error("payload must be a JSON object, found {found}")]
    NotAnObject {
        /// The kind actually found.
        found: &'static str,
    },
}

/// Errors from a single stage's execution machinery.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    /// The transform returned an error.
    #[error("Stage '{stage}' transform failed for task {task_id}: {message}")]
    Transform {
        /// The stage name.
        stage: String,
        /// The task that failed.
        task_id: TaskId,
        /// The error message.
        message: String,
    },

    /// The transform panicked.
    #[error("Stage '{stage}' transform panicked for task {task_id}: {message}")]
    Panicked {
        /// The stage name.
        stage: String,
        /// The task that failed.
        task_id: TaskId,
        /// The panic message.
        message: String,
    },

    /// The transform exceeded its timeout.
    #[error("Stage '{stage}' timed out on task {task_id} after {timeout_ms}ms")]
    Timeout {
        /// The stage name.
        stage: String,
        /// The task that timed out.
        task_id: TaskId,
        /// The configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The run was cancelled while the task was in flight.
    #[error("Stage '{stage}' cancelled task {task_id}: {reason}")]
    Cancelled {
        /// The stage name.
        stage: String,
        /// The aborted task.
        task_id: TaskId,
        /// The cancellation reason.
        reason: String,
    },

    /// The transform succeeded but the next stage had no room for the result.
    #[error("Stage '{stage}' could not forward task {task_id}: stage '{next}' is full")]
    ForwardRejected {
        /// The stage name.
        stage: String,
        /// The task whose result was dropped.
        task_id: TaskId,
        /// The stage that refused the result.
        next: String,
    },

    /// The execution unit went away without reporting a result.
    #[error("Stage '{stage}' lost the result of task {task_id}")]
    Lost {
        /// The stage name.
        stage: String,
        /// The task whose result was lost.
        task_id: TaskId,
    },
}

impl StageError {
    /// Returns the stage the error happened in.
    #[must_use]
    pub fn stage(&self) -> &str {
        match self {
            Self::Transform { stage, .. }
            | Self::Panicked { stage, .. }
            | Self::Timeout { stage, .. }
            | Self::Cancelled { stage, .. }
            | Self::ForwardRejected { stage, .. }
            | Self::Lost { stage, .. } => stage,
        }
    }

    /// Returns the task the error refers to.
    #[must_use]
    pub fn task_id(&self) -> TaskId {
        match self {
            Self::Transform { task_id, .. }
            | Self::Panicked { task_id, .. }
            | Self::Timeout { task_id, .. }
            | Self::Cancelled { task_id, .. }
            | Self::ForwardRejected { task_id, .. }
            | Self::Lost { task_id, .. } => *task_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_error_info_creation() {
        let info = ContractErrorInfo::new("CASCADE-EMPTY", "No stages")
            .with_fix_hint("Add a stage")
            .with_context_entry("pipeline", "p");

        assert_eq!(info.code, "CASCADE-EMPTY");
        assert_eq!(info.fix_hint, Some("Add a stage".to_string()));
        assert_eq!(info.context.get("pipeline"), Some(&"p".to_string()));
    }

    #[test]
    fn test_validation_error_code() {
        let err = PipelineValidationError::new("bad")
            .with_stages(vec!["a".to_string()])
            .with_error_info(ContractErrorInfo::new("CASCADE-CAPACITY", "zero"));

        assert_eq!(err.code(), Some("CASCADE-CAPACITY"));
        assert_eq!(err.to_string(), "bad");
        assert_eq!(err.stages, vec!["a".to_string()]);
    }

    #[test]
    fn test_admission_rejected_message() {
        let err = CascadeError::AdmissionRejected {
            task_id: TaskId(4),
            admitted: 3,
        };
        assert!(err.to_string().contains("Task 4 rejected"));
        assert!(err.to_string().contains("admitted 3"));
    }

    #[test]
    fn test_stage_error_task_id() {
        let err = StageError::Timeout {
            stage: "slow".to_string(),
            task_id: TaskId(9),
            timeout_ms: 10,
        };
        assert_eq!(err.task_id(), TaskId(9));
        assert!(err.to_string().contains("after 10ms"));
    }

    #[test]
    fn test_payload_error_display() {
        let err = PayloadError::WrongKind {
            key: "a".to_string(),
            expected: "integer",
            found: "string",
        };
        assert_eq!(err.to_string(), "key 'a' expected integer, found string");
    }
}
