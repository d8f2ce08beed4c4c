//! Session event type for lifecycle notifications.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::StageIndex;

/// An event emitted by the orchestrator while a session progresses.
///
/// Events are handed to an [`crate::events::EventSink`] for logging or
/// collection in tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    /// The event type (e.g., "stage.started", "session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The event payload data.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl SessionEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: crate::utils::iso_timestamp(),
            data: HashMap::new(),
        }
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Converts the payload to a JSON object.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        let data_map: serde_json::Map<String, serde_json::Value> =
            self.data.clone().into_iter().collect();
        serde_json::Value::Object(data_map)
    }

    /// Creates a "session.started" event.
    #[must_use]
    pub fn session_started(session_id: &str, generation: u64) -> Self {
        Self::new("session.started")
            .add_data("session_id", serde_json::json!(session_id))
            .add_data("generation", serde_json::json!(generation))
    }

    /// Creates a "photo.captured" event.
    #[must_use]
    pub fn photo_captured(session_id: &str, index: StageIndex) -> Self {
        Self::new("photo.captured")
            .add_data("session_id", serde_json::json!(session_id))
            .add_data("index", serde_json::json!(index.get()))
    }

    /// Creates a "stage.started" event.
    #[must_use]
    pub fn stage_started(session_id: &str, stage: StageIndex) -> Self {
        Self::new("stage.started")
            .add_data("session_id", serde_json::json!(session_id))
            .add_data("stage", serde_json::json!(stage.get()))
    }

    /// Creates a "stage.completed" event.
    #[must_use]
    pub fn stage_completed(session_id: &str, stage: StageIndex, elapsed_ms: u64, category: &str) -> Self {
        Self::new("stage.completed")
            .add_data("session_id", serde_json::json!(session_id))
            .add_data("stage", serde_json::json!(stage.get()))
            .add_data("elapsed_ms", serde_json::json!(elapsed_ms))
            .add_data("category", serde_json::json!(category))
    }

    /// Creates a "stage.failed" event.
    #[must_use]
    pub fn stage_failed(session_id: &str, stage: StageIndex, elapsed_ms: u64, error: &str) -> Self {
        Self::new("stage.failed")
            .add_data("session_id", serde_json::json!(session_id))
            .add_data("stage", serde_json::json!(stage.get()))
            .add_data("elapsed_ms", serde_json::json!(elapsed_ms))
            .add_data("error", serde_json::json!(error))
    }

    /// Creates a "session.completed" event.
    #[must_use]
    pub fn session_completed(session_id: &str, failed_stages: usize) -> Self {
        Self::new("session.completed")
            .add_data("session_id", serde_json::json!(session_id))
            .add_data("failed_stages", serde_json::json!(failed_stages))
    }

    /// Creates a "session.failed" event.
    #[must_use]
    pub fn session_failed(session_id: &str, error: &str) -> Self {
        Self::new("session.failed")
            .add_data("session_id", serde_json::json!(session_id))
            .add_data("error", serde_json::json!(error))
    }

    /// Creates a "session.reset" event.
    #[must_use]
    pub fn session_reset(previous_session_id: &str, generation: u64) -> Self {
        Self::new("session.reset")
            .add_data("previous_session_id", serde_json::json!(previous_session_id))
            .add_data("generation", serde_json::json!(generation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = SessionEvent::new("custom.event");
        assert_eq!(event.event_type, "custom.event");
        assert!(event.data.is_empty());
        assert!(event.timestamp.contains('T'));
    }

    #[test]
    fn test_stage_completed_event() {
        let event = SessionEvent::stage_completed("abc", StageIndex::FIRST, 1500, "General Structural Analysis");
        assert_eq!(event.event_type, "stage.completed");
        assert_eq!(event.data.get("stage"), Some(&serde_json::json!(1)));
        assert_eq!(event.data.get("elapsed_ms"), Some(&serde_json::json!(1500)));
    }

    #[test]
    fn test_payload_is_object() {
        let event = SessionEvent::session_failed("abc", "asset missing");
        let payload = event.payload();
        assert_eq!(payload["error"], "asset missing");
        assert_eq!(payload["session_id"], "abc");
    }

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::session_reset("abc", 4);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"session.reset""#));
    }
}
