//! Task outcome and pipeline state enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to one task during one stage execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Transformed and handed to the next stage.
    Forwarded,
    /// Transformed by the last stage; the result left the pipeline.
    Sunk,
    /// The task failed and was not forwarded.
    Failed,
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forwarded => write!(f, "forwarded"),
            Self::Sunk => write!(f, "sunk"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl TaskOutcome {
    /// Returns true if the transform produced a result that was kept.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Forwarded | Self::Sunk)
    }
}

/// Lifecycle of a pipeline between and during runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No run is in progress.
    #[default]
    Idle,
    /// A run is sweeping the stages.
    Running,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_outcome_display() {
        assert_eq!(TaskOutcome::Forwarded.to_string(), "forwarded");
        assert_eq!(TaskOutcome::Sunk.to_string(), "sunk");
        assert_eq!(TaskOutcome::Failed.to_string(), "failed");
    }

    #[test]
    fn test_task_outcome_is_success() {
        assert!(TaskOutcome::Forwarded.is_success());
        assert!(TaskOutcome::Sunk.is_success());
        assert!(!TaskOutcome::Failed.is_success());
    }

    #[test]
    fn test_pipeline_state_default() {
        assert_eq!(PipelineState::default(), PipelineState::Idle);
    }

    #[test]
    fn test_pipeline_state_serialize() {
        let json = serde_json::to_string(&PipelineState::Running).unwrap();
        assert_eq!(json, r#""running""#);

        let state: PipelineState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, PipelineState::Running);
    }
}
