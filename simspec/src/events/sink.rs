//! Event sink trait and implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, Level};

use crate::core::SessionEvent;

/// Receives session lifecycle events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: SessionEvent);

    /// Emits an event without blocking.
    ///
    /// Must never panic. Errors are logged and suppressed.
    fn try_emit(&self, event: SessionEvent);
}

/// A sink that discards every event.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: SessionEvent) {}

    fn try_emit(&self, _event: SessionEvent) {}
}

/// A sink that logs events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink at `level`. Anything but DEBUG logs at INFO.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log_event(&self, event: &SessionEvent) {
        let payload = event.payload();
        if self.level == Level::DEBUG {
            debug!(
                event_type = %event.event_type,
                event_data = %payload,
                "Event: {}", event.event_type
            );
        } else {
            info!(
                event_type = %event.event_type,
                event_data = %payload,
                "Event: {}", event.event_type
            );
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: SessionEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: SessionEvent) {
        self.log_event(&event);
    }
}

/// A sink that keeps every event, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<SessionEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.read().clone()
    }

    /// Returns the collected event types in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .read()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events whose type starts with `type_prefix`.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<SessionEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: SessionEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: SessionEvent) {
        self.events.write().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageIndex;

    #[tokio::test]
    async fn test_noop_sink() {
        let sink = NoOpEventSink;
        sink.emit(SessionEvent::new("test")).await;
        sink.try_emit(SessionEvent::session_started("abc", 0));
    }

    #[tokio::test]
    async fn test_logging_sink() {
        let sink = LoggingEventSink::debug();
        sink.emit(SessionEvent::stage_started("abc", StageIndex::FIRST)).await;
        LoggingEventSink::default().try_emit(SessionEvent::new("test.event"));
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(SessionEvent::session_started("abc", 1)).await;
        sink.try_emit(SessionEvent::photo_captured("abc", StageIndex::FIRST));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.event_types(), vec!["session.started", "photo.captured"]);
        assert_eq!(sink.events()[0].data["generation"], serde_json::json!(1));
    }

    #[tokio::test]
    async fn test_collecting_sink_filter_and_clear() {
        let sink = CollectingEventSink::new();
        sink.try_emit(SessionEvent::stage_started("abc", StageIndex::FIRST));
        sink.try_emit(SessionEvent::stage_failed("abc", StageIndex::FIRST, 5, "boom"));
        sink.try_emit(SessionEvent::session_completed("abc", 1));

        assert_eq!(sink.events_of_type("stage.").len(), 2);
        assert_eq!(sink.events_of_type("session.").len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}
