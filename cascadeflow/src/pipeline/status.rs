//! Structured pipeline status snapshots.

use crate::core::{PipelineState, TaskId};
use serde::Serialize;
use std::fmt;

/// Point-in-time view of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSnapshot {
    /// The stage name.
    pub name: String,
    /// The stage capacity.
    pub capacity: usize,
    /// Tasks executing at snapshot time.
    pub in_flight: usize,
    /// Buffered task ids in FIFO order.
    pub task_ids: Vec<TaskId>,
}

impl StageSnapshot {
    /// Returns the number of buffered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.task_ids.len()
    }

    /// Returns true if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty()
    }
}

/// Point-in-time view of a pipeline, stages in execution order.
///
/// Each stage is read under its own lock, so the snapshot as a whole is not
/// atomic across stages while a run is in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStatus {
    /// The pipeline name.
    pub pipeline: String,
    /// Run state at snapshot time.
    pub state: PipelineState,
    /// Per-stage snapshots.
    pub stages: Vec<StageSnapshot>,
}

impl PipelineStatus {
    /// Returns the total number of buffered tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.stages.iter().map(StageSnapshot::len).sum()
    }

    /// Returns the snapshot of a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageSnapshot> {
        self.stages.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for PipelineStatus {
    /// Renders `pipeline{stage1{1, 2}, stage2{}}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.pipeline)?;
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}{{", stage.name)?;
            for (j, id) in stage.task_ids.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{id}")?;
            }
            write!(f, "}}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> PipelineStatus {
        PipelineStatus {
            pipeline: "sample".to_string(),
            state: PipelineState::Idle,
            stages: vec![
                StageSnapshot {
                    name: "add".to_string(),
                    capacity: 3,
                    in_flight: 0,
                    task_ids: vec![TaskId(1), TaskId(2), TaskId(3)],
                },
                StageSnapshot {
                    name: "print".to_string(),
                    capacity: 3,
                    in_flight: 0,
                    task_ids: vec![],
                },
            ],
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(snapshot().to_string(), "sample{add{1, 2, 3}, print{}}");
    }

    #[test]
    fn test_pending_and_lookup() {
        let status = snapshot();
        assert_eq!(status.pending(), 3);
        assert_eq!(status.stage("add").map(StageSnapshot::len), Some(3));
        assert!(status.stage("print").is_some_and(StageSnapshot::is_empty));
        assert!(status.stage("missing").is_none());
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(json["stages"][0]["task_ids"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["state"], "idle");
    }
}
