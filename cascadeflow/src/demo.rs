//! A ready-made three-stage cascade: add, stringify, print.
//!
//! `add` turns `{a, b}` into `{result: a + b}`, `stringify` renders the
//! integer result as a string and `print` logs the final payload before
//! passing it through to the pipeline's outputs.

use crate::core::Payload;
use crate::errors::PipelineValidationError;
use crate::pipeline::Pipeline;
use crate::stages::{transform_fn, Stage, Transform};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Stage names, in execution order.
pub const STAGE_NAMES: [&str; 3] = ["add", "stringify", "print"];

/// Sums the integer keys `a` and `b` into `result`.
#[must_use]
pub fn add_transform() -> Arc<dyn Transform> {
    transform_fn(|payload: Payload| {
        let sum = payload.require_i64("a")? + payload.require_i64("b")?;
        Ok(Payload::new().with("result", sum))
    })
}

/// Replaces the integer `result` with its decimal string.
#[must_use]
pub fn stringify_transform() -> Arc<dyn Transform> {
    transform_fn(|payload: Payload| {
        let result = payload.require_i64("result")?;
        Ok(Payload::new().with("result", result.to_string()))
    })
}

/// Logs the payload and returns it unchanged.
#[must_use]
pub fn print_transform() -> Arc<dyn Transform> {
    transform_fn(|payload: Payload| {
        let rendered = payload.get("result").map_or_else(String::new, render);
        info!(result = %rendered, "Final output");
        Ok(payload)
    })
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds the add → stringify → print pipeline with every stage sized `capacity`.
///
/// # Errors
///
/// Fails if `capacity` is zero.
pub fn cascade_pipeline(capacity: usize) -> Result<Pipeline, PipelineValidationError> {
    let [add, stringify, print] = STAGE_NAMES;
    Pipeline::builder("cascade")
        .stage(Stage::new(add, capacity, add_transform()))
        .stage(Stage::new(stringify, capacity, stringify_transform()))
        .stage(Stage::new(print, capacity, print_transform()))
        .build()
}

/// Builds the `{a, b}` payload the `add` stage expects.
#[must_use]
pub fn operands(a: i64, b: i64) -> Payload {
    Payload::new().with("a", a).with("b", b)
}
