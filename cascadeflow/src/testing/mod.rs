//! Testing utilities for cascadeflow pipelines.
//!
//! Ready-made transforms that record, fail, panic or stall, for exercising
//! stage and pipeline behavior without writing bespoke closures.

mod mocks;

pub use mocks::{
    FailOnKey, FailingTransform, PanickingTransform, RecordingTransform, SlowTransform,
};
