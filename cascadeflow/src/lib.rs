//! # Cascadeflow
//!
//! Bounded multi-stage task cascades.
//!
//! A pipeline is an ordered list of stages. Each stage is a bounded FIFO
//! buffer bound to a transform; the output of one stage becomes a task of
//! the next. Cascadeflow provides:
//!
//! - **Bounded admission**: a full stage rejects new tasks instead of blocking
//! - **Fan-out execution**: every buffered task of a stage runs in its own tokio task
//! - **Fault isolation**: errors, panics and timeouts fail one task, never its siblings
//! - **Event-driven observability**: structured lifecycle events and `tracing` output
//! - **Cancellation**: in-flight work is aborted and recorded, buffers are kept
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cascadeflow::prelude::*;
//!
//! let pipeline = PipelineBuilder::new("sums")
//!     .stage(Stage::new("add", 8, transform_fn(|p: Payload| {
//!         Ok(Payload::new().with("result", p.require_i64("a")? + p.require_i64("b")?))
//!     })))
//!     .stage(Stage::new("print", 8, Arc::new(IdentityTransform)))
//!     .build()?;
//!
//! pipeline.submit(Task::new(1, Payload::new().with("a", 1).with("b", 2)));
//! let report = pipeline.run().await;
//! assert_eq!(report.outputs.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod context;
pub mod core;
pub mod demo;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::context::RunContext;
    pub use crate::core::{
        FailureKind, FailureRecord, Payload, PipelineState, Task, TaskId, TaskOutcome,
    };
    pub use crate::errors::{
        CascadeError, ContractErrorInfo, PayloadError, PipelineValidationError, StageError,
    };
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, PipelineEvent,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{
        AdmissionPolicy, DrivePolicy, Pipeline, PipelineBuilder, PipelineConfig,
        PipelineStatus, RunReport, StageSnapshot,
    };
    pub use crate::stages::{
        async_transform_fn, transform_fn, AsyncFnTransform, DrainReport, FnTransform,
        IdentityTransform, Stage, StageOptions, Transform,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[tokio::test]
    async fn prelude_covers_a_full_run() {
        let pipeline = PipelineBuilder::new("sums")
            .stage(Stage::new(
                "add",
                2,
                transform_fn(|p: Payload| {
                    Ok(Payload::new().with("result", p.require_i64("a")? + p.require_i64("b")?))
                }),
            ))
            .build()
            .unwrap();

        assert!(pipeline.submit(Task::new(1, Payload::new().with("a", 1).with("b", 2))));
        let report = pipeline.run().await;

        assert_eq!(
            report.outputs[0].payload().require_i64("result").unwrap(),
            3
        );
    }
}
