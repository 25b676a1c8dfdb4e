//! Core data model for cascadeflow.
//!
//! This module contains the types that flow between stages:
//! - Payloads and their typed accessors
//! - Tasks and task identities
//! - Per-task failure records

mod failure;
mod payload;
mod status;
mod task;

pub use failure::{FailureKind, FailureRecord};
pub use payload::Payload;
pub use status::{PipelineState, TaskOutcome};
pub use task::{Task, TaskId};
