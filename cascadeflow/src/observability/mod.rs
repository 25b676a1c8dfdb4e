//! Observability utilities.
//!
//! Structured lifecycle events go through [`crate::events::EventSink`]; this
//! module wires the `tracing` output itself.

mod logging;

pub use logging::{init_tracing, LogFormat};
