//! The bounded stage buffer and its fan-out executor.

use super::{DrainReport, StageOptions, Transform};
use crate::context::RunContext;
use crate::core::{FailureRecord, Payload, Task, TaskId};
use crate::errors::StageError;
use crate::events::event_types;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Semaphore};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// A bounded FIFO of pending tasks bound to one transform.
///
/// The buffer lock is held only while the buffer itself is mutated or read;
/// transforms always run outside of it, so producers feeding this stage are
/// never blocked by slow work.
pub struct Stage {
    name: String,
    capacity: usize,
    buffer: Mutex<VecDeque<Task>>,
    transform: Arc<dyn Transform>,
    in_flight: Arc<AtomicUsize>,
    options: StageOptions,
}

/// How one execution unit ended.
enum UnitResult {
    Forwarded,
    Sunk(Task),
    Rejected(Task, StageError),
    Failed(StageError),
}

impl Stage {
    /// Creates a new stage.
    pub fn new(name: impl Into<String>, capacity: usize, transform: Arc<dyn Transform>) -> Self {
        Self {
            name: name.into(),
            capacity,
            buffer: Mutex::new(VecDeque::new()),
            transform,
            in_flight: Arc::new(AtomicUsize::new(0)),
            options: StageOptions::default(),
        }
    }

    /// Replaces the execution options.
    #[must_use]
    pub fn with_options(mut self, options: StageOptions) -> Self {
        self.options = options;
        self
    }

    /// Limits how many tasks of one drain run at the same time.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.options.max_concurrency = Some(limit);
        self
    }

    /// Sets the per-task timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_timeout(timeout);
        self
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the maximum number of buffered tasks.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the execution options.
    #[must_use]
    pub fn options(&self) -> &StageOptions {
        &self.options
    }

    /// Returns the effective concurrency limit of a drain.
    ///
    /// Never zero, and never above [`Semaphore::MAX_PERMITS`].
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.options
            .max_concurrency
            .unwrap_or(self.capacity)
            .clamp(1, Semaphore::MAX_PERMITS)
    }

    /// Returns the number of buffered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Returns true if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Returns the number of tasks currently executing.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Returns the ids of the buffered tasks in FIFO order.
    #[must_use]
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.buffer.lock().iter().map(Task::id).collect()
    }

    /// Admits a task if there is spare capacity.
    ///
    /// Returns `false` and drops the task when the buffer is full.
    pub fn enqueue(&self, task: Task) -> bool {
        self.offer(task).is_ok()
    }

    /// Admits a task if there is spare capacity, handing it back otherwise.
    pub fn offer(&self, task: Task) -> Result<(), Task> {
        let mut buffer = self.buffer.lock();
        if buffer.len() < self.capacity {
            buffer.push_back(task);
            Ok(())
        } else {
            Err(task)
        }
    }

    /// Executes every task buffered right now and forwards the results.
    ///
    /// The buffer is swapped out in one step; tasks arriving afterwards wait
    /// for the next drain. Each task runs in its own tokio task, at most
    /// [`Stage::max_concurrency`] at a time. Successful results are offered
    /// to `next`, or collected as outputs when `next` is `None`. Returns once
    /// every unit of the batch has finished.
    pub async fn drain_and_execute(&self, next: Option<&Arc<Stage>>, ctx: &RunContext) -> DrainReport {
        let batch = std::mem::take(&mut *self.buffer.lock());
        let mut report = DrainReport::new(&self.name, batch.len());
        if batch.is_empty() {
            return report;
        }

        let start = Instant::now();
        debug!(stage = %self.name, batch = batch.len(), "Draining stage");
        ctx.emit_stage(
            event_types::DRAIN_STARTED,
            &self.name,
            serde_json::json!({ "batch": batch.len() }),
        );

        let permits = Arc::new(Semaphore::new(self.max_concurrency()));
        let timeout = self.options.timeout().or_else(|| ctx.default_timeout());

        let mut units = FuturesUnordered::new();
        let mut abort_on_drop = AbortOnDrop::default();
        for task in batch {
            let (id, payload) = task.into_parts();
            let stage = self.name.clone();
            let transform = self.transform.clone();
            let next = next.cloned();
            let permits = permits.clone();
            let cancel = ctx.cancellation().clone();

            let in_flight = InFlight::enter(&self.in_flight);
            let handle = tokio::spawn(async move {
                let _in_flight = in_flight;
                let work = async {
                    let _permit = permits.acquire_owned().await;
                    apply_guarded(&stage, transform.as_ref(), id, payload, timeout).await
                };
                let result = tokio::select! {
                    biased;
                    () = cancel.cancelled() => Err(StageError::Cancelled {
                        stage: stage.clone(),
                        task_id: id,
                        reason: cancel.reason().unwrap_or_default(),
                    }),
                    result = work => result,
                };
                match result {
                    Ok(output) => forward(&stage, id, output, next.as_deref()),
                    Err(err) => UnitResult::Failed(err),
                }
            });
            abort_on_drop.0.push(handle.abort_handle());
            units.push(async move { (id, handle.await) });
        }

        while let Some((id, joined)) = units.next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    warn!(stage = %self.name, task_id = id.0, error = %join_error, "Execution unit did not complete");
                    UnitResult::Failed(StageError::Lost {
                        stage: self.name.clone(),
                        task_id: id,
                    })
                }
            };
            match outcome {
                UnitResult::Forwarded => report.forwarded.push(id),
                UnitResult::Sunk(task) => report.outputs.push(task),
                UnitResult::Rejected(task, err) => {
                    self.record_failure(&mut report, &err, ctx);
                    report.rejected.push(task);
                }
                UnitResult::Failed(err) => self.record_failure(&mut report, &err, ctx),
            }
        }

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            stage = %self.name,
            succeeded = report.succeeded(),
            failed = report.failures.len(),
            duration_ms,
            "Stage drained"
        );
        ctx.emit_stage(
            event_types::DRAIN_COMPLETED,
            &self.name,
            serde_json::json!({
                "executed": report.executed,
                "succeeded": report.succeeded(),
                "failed": report.failures.len(),
                "duration_ms": duration_ms,
            }),
        );

        report
    }

    /// Pops the head task, runs it, and returns its result to the caller.
    ///
    /// The transform runs in a dedicated tokio task whose result comes back
    /// over a oneshot channel. Returns `Ok(None)` if the buffer is empty.
    pub async fn execute_one(&self) -> Result<Option<Payload>, StageError> {
        let head = self.buffer.lock().pop_front();
        let Some(task) = head else {
            return Ok(None);
        };

        let (id, payload) = task.into_parts();
        let stage = self.name.clone();
        let transform = self.transform.clone();
        let timeout = self.options.timeout();
        let (tx, rx) = oneshot::channel();

        let in_flight = InFlight::enter(&self.in_flight);
        let handle = tokio::spawn(async move {
            let _in_flight = in_flight;
            let result = apply_guarded(&stage, transform.as_ref(), id, payload, timeout).await;
            // The caller only disappears if its future was dropped.
            let _ = tx.send(result);
        });

        let _abort_on_drop = AbortOnDrop(vec![handle.abort_handle()]);

        let result = rx.await.unwrap_or_else(|_| {
            Err(StageError::Lost {
                stage: self.name.clone(),
                task_id: id,
            })
        });

        result.map(Some)
    }

    fn record_failure(&self, report: &mut DrainReport, err: &StageError, ctx: &RunContext) {
        warn!(stage = %self.name, task_id = err.task_id().0, error = %err, "Task failed");
        let record = FailureRecord::from(err);
        let event_type = match err {
            StageError::ForwardRejected { .. } => event_types::TASK_FORWARD_REJECTED,
            _ => event_types::TASK_FAILED,
        };
        ctx.emit_task(
            event_type,
            &self.name,
            record.task_id,
            serde_json::json!({ "kind": record.kind, "error": record.error }),
        );
        report.failures.push(record);
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("buffered", &self.len())
            .field("in_flight", &self.in_flight())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Counts one execution unit as in flight until dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Aborts spawned units whose caller stopped waiting for them.
///
/// Aborting a unit that already finished is a no-op.
#[derive(Default)]
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Runs the transform with panic isolation and an optional timeout.
async fn apply_guarded(
    stage: &str,
    transform: &dyn Transform,
    task_id: TaskId,
    payload: Payload,
    timeout: Option<Duration>,
) -> Result<Payload, StageError> {
    let guarded = AssertUnwindSafe(transform.apply(payload)).catch_unwind();
    let caught = match timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(caught) => caught,
            Err(_) => {
                return Err(StageError::Timeout {
                    stage: stage.to_string(),
                    task_id,
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })
            }
        },
        None => guarded.await,
    };

    match caught {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(StageError::Transform {
            stage: stage.to_string(),
            task_id,
            message: format!("{err:#}"),
        }),
        Err(panic) => Err(StageError::Panicked {
            stage: stage.to_string(),
            task_id,
            message: panic_message(panic.as_ref()),
        }),
    }
}

/// Hands a successful result to the next stage, or sinks it.
fn forward(stage: &str, task_id: TaskId, output: Payload, next: Option<&Stage>) -> UnitResult {
    let successor = Task::successor(task_id, output);
    match next {
        None => UnitResult::Sunk(successor),
        Some(next) => match next.offer(successor) {
            Ok(()) => UnitResult::Forwarded,
            Err(rejected) => UnitResult::Rejected(
                rejected,
                StageError::ForwardRejected {
                    stage: stage.to_string(),
                    task_id,
                    next: next.name().to_string(),
                },
            ),
        },
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
