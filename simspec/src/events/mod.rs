//! Session event sinks.
//!
//! The orchestrator reports lifecycle events (`session.started`,
//! `stage.completed`, ...) through an injected [`EventSink`]. Sinks must
//! never fail the caller.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
