//! Tasks and task identities.

use super::Payload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation token chosen by the caller for a submitted task.
///
/// The id is carried unchanged through every stage, so a sink output can be
/// matched to the submission that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A unit of work: an identity plus the payload to transform.
///
/// Tasks are never mutated after creation. A stage consumes the task, runs
/// its transform on the payload and builds a fresh task for the next stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    payload: Payload,
}

impl Task {
    /// Creates a new task.
    #[must_use]
    pub fn new(id: impl Into<TaskId>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    /// Returns the task id.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Splits the task into its id and owned payload.
    #[must_use]
    pub fn into_parts(self) -> (TaskId, Payload) {
        (self.id, self.payload)
    }

    /// Builds the successor task carrying `payload` under the same id.
    #[must_use]
    pub fn successor(id: TaskId, payload: Payload) -> Self {
        Self { id, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_display() {
        assert_eq!(TaskId(7).to_string(), "7");
        assert_eq!(TaskId::default(), TaskId(0));
    }

    #[test]
    fn test_task_into_parts() {
        let task = Task::new(3, Payload::new().with("a", 1));
        assert_eq!(task.id(), TaskId(3));

        let (id, payload) = task.into_parts();
        assert_eq!(id, TaskId(3));
        assert_eq!(payload.require_i64("a"), Ok(1));
    }

    #[test]
    fn test_successor_keeps_id() {
        let next = Task::successor(TaskId(5), Payload::new().with("result", 3));
        assert_eq!(next.id(), TaskId(5));
        assert_eq!(next.payload().require_i64("result"), Ok(3));
    }
}
