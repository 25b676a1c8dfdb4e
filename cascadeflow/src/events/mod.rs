//! Lifecycle events for observability.
//!
//! Pipelines and stages report what they do through an [`EventSink`]. The
//! default sink discards everything; [`LoggingEventSink`] forwards events to
//! `tracing`, and [`CollectingEventSink`] keeps them for assertions.

mod event;
mod sink;

pub use event::{event_types, PipelineEvent};
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
