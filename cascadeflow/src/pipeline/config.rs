//! Pipeline configuration.

use crate::errors::CascadeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which stages accept externally submitted tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// Only the first stage admits new tasks, so every task starts at the top.
    #[default]
    HeadOnly,
    /// The first stage in order with spare capacity admits the task.
    FirstAvailable,
}

/// How `run` walks the stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrivePolicy {
    /// Sweep repeatedly until one sweep finds every stage empty.
    #[default]
    Exhaustive,
    /// Sweep once, in order. Tasks entering an already drained stage wait
    /// for the next run.
    SinglePass,
}

/// Pipeline-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Admission policy for `submit`.
    #[serde(default)]
    pub admission: AdmissionPolicy,
    /// Drive policy for `run`.
    #[serde(default)]
    pub drive: DrivePolicy,
    /// Timeout for tasks of stages without their own, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_timeout_ms: Option<u64>,
}

impl PipelineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::Config`] if the text is not a valid configuration.
    pub fn from_json(json: &str) -> Result<Self, CascadeError> {
        serde_json::from_str(json).map_err(|e| CascadeError::Config(e.to_string()))
    }

    /// Sets the admission policy.
    #[must_use]
    pub fn with_admission(mut self, admission: AdmissionPolicy) -> Self {
        self.admission = admission;
        self
    }

    /// Sets the drive policy.
    #[must_use]
    pub fn with_drive(mut self, drive: DrivePolicy) -> Self {
        self.drive = drive;
        self
    }

    /// Sets the default task timeout.
    #[must_use]
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Returns the default task timeout.
    #[must_use]
    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }
}
