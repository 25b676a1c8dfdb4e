//! The pipeline executor: admission, sweeping and status.

use super::builder::validate_stages;
use super::{
    AdmissionPolicy, DrivePolicy, PipelineBuilder, PipelineConfig, PipelineStatus, RunReport,
    StageSnapshot,
};
use crate::cancellation::CancellationToken;
use crate::context::RunContext;
use crate::core::{PipelineState, Task};
use crate::errors::{CascadeError, PipelineValidationError};
use crate::events::{event_types, EventSink, NoOpEventSink};
use crate::stages::Stage;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// An ordered cascade of stages.
///
/// Results of stage *i* become tasks of stage *i + 1*; results of the last
/// stage leave the pipeline through [`RunReport::outputs`].
pub struct Pipeline {
    name: String,
    stages: Vec<Arc<Stage>>,
    config: PipelineConfig,
    events: Arc<dyn EventSink>,
    cancel: Arc<CancellationToken>,
    run_gate: tokio::sync::Mutex<()>,
    state: Arc<RwLock<PipelineState>>,
}

/// Puts the pipeline back to `Idle` however a run ends.
struct RunningGuard(Arc<RwLock<PipelineState>>);

impl RunningGuard {
    fn enter(state: &Arc<RwLock<PipelineState>>) -> Self {
        *state.write() = PipelineState::Running;
        Self(state.clone())
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        *self.0.write() = PipelineState::Idle;
    }
}

impl Pipeline {
    /// Creates a pipeline with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage list is invalid (see
    /// [`PipelineBuilder::build`]).
    pub fn new(
        name: impl Into<String>,
        stages: Vec<Arc<Stage>>,
    ) -> Result<Self, PipelineValidationError> {
        let name = name.into();
        validate_stages(&name, &stages)?;
        Ok(Self::from_parts(
            name,
            stages,
            PipelineConfig::default(),
            Arc::new(NoOpEventSink),
        ))
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    pub(crate) fn from_parts(
        name: String,
        stages: Vec<Arc<Stage>>,
        config: PipelineConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            name,
            stages,
            config,
            events,
            cancel: Arc::new(CancellationToken::new()),
            run_gate: tokio::sync::Mutex::new(()),
            state: Arc::new(RwLock::new(PipelineState::Idle)),
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Arc<Stage>] {
        &self.stages
    }

    /// Returns a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&Arc<Stage>> {
        self.stages.iter().find(|s| s.name() == name)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns whether a run is in progress.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        *self.state.read()
    }

    /// Returns the total number of buffered tasks across all stages.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.stages.iter().map(|s| s.len()).sum()
    }

    /// Admits an external task according to the admission policy.
    ///
    /// Returns `false` if no eligible stage has room; the task is dropped.
    pub fn submit(&self, task: Task) -> bool {
        self.try_submit(task).is_ok()
    }

    /// Admits an external task, handing it back if no eligible stage has room.
    pub fn try_submit(&self, task: Task) -> Result<(), Task> {
        match self.config.admission {
            AdmissionPolicy::HeadOnly => match self.stages.first() {
                Some(head) => head.offer(task),
                None => Err(task),
            },
            AdmissionPolicy::FirstAvailable => {
                let mut task = task;
                for stage in &self.stages {
                    match stage.offer(task) {
                        Ok(()) => return Ok(()),
                        Err(rejected) => task = rejected,
                    }
                }
                Err(task)
            }
        }
    }

    /// Submits tasks in order, stopping at the first rejection.
    ///
    /// Returns the number of admitted tasks.
    pub fn submit_all(&self, tasks: impl IntoIterator<Item = Task>) -> Result<usize, CascadeError> {
        let mut admitted = 0;
        for task in tasks {
            if let Err(rejected) = self.try_submit(task) {
                return Err(CascadeError::AdmissionRejected {
                    task_id: rejected.id(),
                    admitted,
                });
            }
            admitted += 1;
        }
        Ok(admitted)
    }

    /// Drives the stages according to the drive policy.
    ///
    /// With [`DrivePolicy::Exhaustive`] this returns once a full sweep finds
    /// every stage empty, so every admitted task has either reached the last
    /// stage's outputs or been recorded as a failure. Concurrent calls are
    /// serialized.
    pub async fn run(&self) -> RunReport {
        let _gate = self.run_gate.lock().await;
        let _running = RunningGuard::enter(&self.state);

        let ctx = RunContext::new()
            .with_cancellation(self.cancel.clone())
            .with_event_sink(self.events.clone())
            .with_default_timeout(self.config.task_timeout());
        let start = Instant::now();
        let mut report = RunReport::new(ctx.run_id(), &self.name);

        info!(
            pipeline = %self.name,
            run_id = %ctx.run_id(),
            pending = self.pending(),
            "Pipeline run started"
        );
        ctx.emit(
            event_types::RUN_STARTED,
            serde_json::json!({ "pipeline": self.name, "pending": self.pending() }),
        );

        loop {
            if ctx.is_cancelled() {
                let reason = self.cancel.reason();
                warn!(pipeline = %self.name, reason = ?reason, "Pipeline run cancelled");
                ctx.emit(
                    event_types::CANCELLED,
                    serde_json::json!({ "pipeline": self.name, "reason": reason }),
                );
                report.mark_cancelled(reason);
                break;
            }

            report.sweeps += 1;
            let drained = self.sweep(&ctx, &mut report).await;
            debug!(pipeline = %self.name, sweep = report.sweeps, drained, "Sweep finished");

            if drained == 0 || self.config.drive == DrivePolicy::SinglePass {
                break;
            }
        }

        report.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            pipeline = %self.name,
            run_id = %report.run_id,
            sweeps = report.sweeps,
            executed = report.executed,
            outputs = report.outputs.len(),
            failures = report.failures.len(),
            duration_ms = report.duration_ms,
            "Pipeline run finished"
        );
        ctx.emit(
            event_types::RUN_COMPLETED,
            serde_json::json!({
                "pipeline": self.name,
                "sweeps": report.sweeps,
                "executed": report.executed,
                "outputs": report.outputs.len(),
                "failures": report.failures.len(),
                "cancelled": report.cancelled,
                "duration_ms": report.duration_ms,
            }),
        );

        report
    }

    /// Drains every stage once, in order. Returns the number of non-empty drains.
    async fn sweep(&self, ctx: &RunContext, report: &mut RunReport) -> usize {
        let mut drained = 0;
        for (index, stage) in self.stages.iter().enumerate() {
            if ctx.is_cancelled() {
                break;
            }
            let next = self.stages.get(index + 1);
            let drain = stage.drain_and_execute(next, ctx).await;
            if drain.is_empty() {
                continue;
            }
            drained += 1;
            report.absorb(drain);
        }
        drained
    }

    /// Requests cancellation of the current and any future run.
    ///
    /// In-flight tasks are aborted and recorded as cancelled; buffered tasks
    /// stay where they are. Call [`Pipeline::reset_cancellation`] to run again.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.cancel.cancel(reason);
    }

    /// Re-arms the pipeline after a cancellation.
    pub fn reset_cancellation(&self) {
        self.cancel.reset();
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Takes a snapshot of every stage's buffer.
    ///
    /// Stages are locked one at a time and only while being read.
    #[must_use]
    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            pipeline: self.name.clone(),
            state: self.state(),
            stages: self
                .stages
                .iter()
                .map(|stage| StageSnapshot {
                    name: stage.name().to_string(),
                    capacity: stage.capacity(),
                    in_flight: stage.in_flight(),
                    task_ids: stage.task_ids(),
                })
                .collect(),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stages)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Payload, TaskId};
    use crate::stages::IdentityTransform;

    fn stage(name: &str, capacity: usize) -> Arc<Stage> {
        Arc::new(Stage::new(name, capacity, Arc::new(IdentityTransform)))
    }

    fn task(id: i64) -> Task {
        Task::new(id, Payload::new())
    }

    #[test]
    fn test_head_only_admission() {
        let pipeline = Pipeline::new("p", vec![stage("a", 1), stage("b", 5)]).unwrap();

        assert!(pipeline.submit(task(1)));
        assert!(!pipeline.submit(task(2)));
        assert_eq!(pipeline.stage("b").map(|s| s.len()), Some(0));
    }

    #[test]
    fn test_first_available_admission() {
        let pipeline = Pipeline::builder("p")
            .shared_stage(stage("a", 1))
            .shared_stage(stage("b", 1))
            .admission(AdmissionPolicy::FirstAvailable)
            .build()
            .unwrap();

        assert!(pipeline.submit(task(1)));
        assert!(pipeline.submit(task(2)));
        assert!(!pipeline.submit(task(3)));

        let status = pipeline.status();
        assert_eq!(status.stages[0].task_ids, vec![TaskId(1)]);
        assert_eq!(status.stages[1].task_ids, vec![TaskId(2)]);
    }

    #[test]
    fn test_submit_all_reports_partial_admission() {
        let pipeline = Pipeline::new("p", vec![stage("a", 2)]).unwrap();

        let err = pipeline
            .submit_all((1..=3).map(task))
            .unwrap_err();

        match err {
            CascadeError::AdmissionRejected { task_id, admitted } => {
                assert_eq!(task_id, TaskId(3));
                assert_eq!(admitted, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(Pipeline::new("p", Vec::new()).is_err());
    }

    #[test]
    fn test_status_is_read_only() {
        let pipeline = Pipeline::new("p", vec![stage("a", 3), stage("b", 3)]).unwrap();
        pipeline.submit(task(1));
        pipeline.submit(task(2));

        let first = pipeline.status();
        let second = pipeline.status();

        assert_eq!(first, second);
        assert_eq!(first.to_string(), "p{a{1, 2}, b{}}");
        assert_eq!(first.state, PipelineState::Idle);
        assert_eq!(pipeline.pending(), 2);
    }

    #[test]
    fn test_cancel_and_reset() {
        let pipeline = Pipeline::new("p", vec![stage("a", 1)]).unwrap();
        pipeline.cancel("stop");
        assert!(pipeline.is_cancelled());

        pipeline.reset_cancellation();
        assert!(!pipeline.is_cancelled());
    }

    #[test]
    fn test_run_blocking_from_sync_code() {
        let pipeline = Pipeline::new("p", vec![stage("a", 2)]).unwrap();
        pipeline.submit(task(1));

        let report = tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(pipeline.run());

        assert_eq!(report.outputs.len(), 1);
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }
}
