//! Pipeline builder with validation.

use super::{AdmissionPolicy, DrivePolicy, Pipeline, PipelineConfig};
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::events::{EventSink, NoOpEventSink};
use crate::stages::Stage;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating validated pipelines.
///
/// Stages run in the order they are added. Validation happens in
/// [`PipelineBuilder::build`]; nothing is silently dropped.
pub struct PipelineBuilder {
    name: String,
    stages: Vec<Arc<Stage>>,
    config: PipelineConfig,
    events: Arc<dyn EventSink>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            config: PipelineConfig::default(),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Appends a stage owned by the pipeline.
    #[must_use]
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Appends a stage handle that may also be held elsewhere.
    #[must_use]
    pub fn shared_stage(mut self, stage: Arc<Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends several stage handles, in order.
    #[must_use]
    pub fn stages(mut self, stages: impl IntoIterator<Item = Arc<Stage>>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the admission policy.
    #[must_use]
    pub fn admission(mut self, admission: AdmissionPolicy) -> Self {
        self.config.admission = admission;
        self
    }

    /// Sets the drive policy.
    #[must_use]
    pub fn drive(mut self, drive: DrivePolicy) -> Self {
        self.config.drive = drive;
        self
    }

    /// Sets the default task timeout.
    #[must_use]
    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_task_timeout(timeout);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage list is empty, a stage name or handle
    /// repeats, or a stage has zero capacity or concurrency.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        validate_stages(&self.name, &self.stages)?;
        Ok(Pipeline::from_parts(
            self.name,
            self.stages,
            self.config,
            self.events,
        ))
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("stages", &self.stages)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Checks a stage list before a pipeline is built from it.
pub(crate) fn validate_stages(
    pipeline: &str,
    stages: &[Arc<Stage>],
) -> Result<(), PipelineValidationError> {
    if stages.is_empty() {
        return Err(PipelineValidationError::new(format!(
            "Pipeline '{pipeline}' has no stages"
        ))
        .with_error_info(
            ContractErrorInfo::new("CASCADE-EMPTY", "Cannot build an empty pipeline")
                .with_fix_hint("Add at least one stage to the pipeline before building."),
        ));
    }

    let mut names = HashSet::new();
    for (index, stage) in stages.iter().enumerate() {
        if stages[..index].iter().any(|earlier| Arc::ptr_eq(earlier, stage)) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' appears more than once in pipeline '{pipeline}'",
                stage.name()
            ))
            .with_stages(vec![stage.name().to_string()])
            .with_error_info(
                ContractErrorInfo::new("CASCADE-DUPLICATE", "The same stage handle is listed twice")
                    .with_context_entry("position", index.to_string())
                    .with_fix_hint("Create a separate stage for each position in the pipeline."),
            ));
        }

        if !names.insert(stage.name()) {
            return Err(PipelineValidationError::new(format!(
                "Duplicate stage name '{}' in pipeline '{pipeline}'",
                stage.name()
            ))
            .with_stages(vec![stage.name().to_string()])
            .with_error_info(
                ContractErrorInfo::new("CASCADE-DUPLICATE", "Stage names must be unique")
                    .with_context_entry("position", index.to_string())
                    .with_fix_hint("Rename one of the stages."),
            ));
        }

        if stage.capacity() == 0 {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' has zero capacity",
                stage.name()
            ))
            .with_stages(vec![stage.name().to_string()])
            .with_error_info(
                ContractErrorInfo::new("CASCADE-CAPACITY", "A stage must hold at least one task")
                    .with_fix_hint("Give the stage a capacity of at least 1."),
            ));
        }

        if stage.options().max_concurrency == Some(0) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' has a concurrency limit of zero",
                stage.name()
            ))
            .with_stages(vec![stage.name().to_string()])
            .with_error_info(
                ContractErrorInfo::new("CASCADE-CONCURRENCY", "A stage must run at least one task at a time")
                    .with_fix_hint("Leave max_concurrency unset or set it to at least 1."),
            ));
        }
    }

    Ok(())
}
