//! Error types for the simspec analysis pipeline.
//!
//! Errors fall in two groups: fatal ones that prevent a session from
//! starting (`ModelLoadError`, state machine misuse) and stage-local ones
//! (`PreprocessError`, `GatewayError`) that are recorded against a single
//! stage while the pipeline keeps going.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::SessionState;

/// The main error type for simspec operations.
#[derive(Debug, Error)]
pub enum SimspecError {
    /// The model asset could not be loaded.
    #[error("{0}")]
    ModelLoad(#[from] ModelLoadError),

    /// A photo could not be prepared for inference.
    #[error("{0}")]
    Preprocess(#[from] PreprocessError),

    /// A model call failed or timed out.
    #[error("{0}")]
    Gateway(#[from] GatewayError),

    /// An operation was requested in a state that does not allow it.
    #[error("Cannot {operation} while session is {state}")]
    InvalidTransition {
        /// The attempted operation.
        operation: &'static str,
        /// The state the session was in.
        state: SessionState,
    },

    /// A photo arrived with an unexpected capture index.
    #[error("Photo out of order: expected capture index {expected}, got {actual}")]
    PhotoOutOfOrder {
        /// The index the session was waiting for.
        expected: u8,
        /// The index carried by the photo.
        actual: u8,
    },

    /// `run` was called while another run is still in progress.
    #[error("An analysis run is already in progress")]
    AlreadyRunning,

    /// A stage result was rejected by the session.
    #[error("{0}")]
    StageOrder(#[from] StageOrderError),

    /// The session was reset while the operation was in flight.
    #[error("Session cancelled: {0}")]
    Cancelled(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimspecError {
    /// Creates an invalid transition error.
    #[must_use]
    pub fn invalid_transition(operation: &'static str, state: SessionState) -> Self {
        Self::InvalidTransition { operation, state }
    }

    /// Returns true if the error ends the session rather than a single stage.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Preprocess(_) | Self::Gateway(_))
    }
}

/// Error raised when the model asset cannot be loaded.
#[derive(Debug, Clone, Error)]
pub enum ModelLoadError {
    /// No file exists at the configured asset path.
    #[error("Model asset not found at {}", path.display())]
    Missing {
        /// The configured asset path.
        path: PathBuf,
    },

    /// The asset exists but the runtime cannot use it.
    #[error("Model asset at {} is incompatible: {reason}", path.display())]
    Incompatible {
        /// The configured asset path.
        path: PathBuf,
        /// The reason reported by the runtime.
        reason: String,
    },

    /// The runtime failed while loading.
    #[error("Model runtime failed to load: {0}")]
    Runtime(String),
}

impl ModelLoadError {
    /// Creates a missing asset error.
    #[must_use]
    pub fn missing(path: impl Into<PathBuf>) -> Self {
        Self::Missing { path: path.into() }
    }

    /// Creates an incompatible asset error.
    #[must_use]
    pub fn incompatible(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Incompatible {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised when a photo cannot be turned into a model frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    /// The photo uses a pixel layout the preprocessor cannot decode.
    #[error("Unsupported pixel format: {format}")]
    UnsupportedFormat {
        /// The format name.
        format: String,
    },

    /// The pixel buffer does not match the declared dimensions.
    #[error("Invalid pixel buffer: {reason}")]
    InvalidBuffer {
        /// What was wrong with the buffer.
        reason: String,
    },
}

impl PreprocessError {
    /// Creates an unsupported format error.
    #[must_use]
    pub fn unsupported(format: impl std::fmt::Display) -> Self {
        Self::UnsupportedFormat {
            format: format.to_string(),
        }
    }

    /// Creates an invalid buffer error.
    #[must_use]
    pub fn invalid_buffer(reason: impl Into<String>) -> Self {
        Self::InvalidBuffer {
            reason: reason.into(),
        }
    }
}

/// Error raised by the model while producing output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Inference error: {message}")]
pub struct InferenceError {
    /// The error message reported by the model runtime.
    pub message: String,
}

impl InferenceError {
    /// Creates a new inference error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors returned by [`crate::gateway::InferenceGateway::ask`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The call exceeded the wall-clock ceiling.
    #[error("Inference timed out after {}s", after.as_secs_f64())]
    Timeout {
        /// The ceiling that was exceeded.
        after: Duration,
    },

    /// The model reported a failure.
    #[error("{0}")]
    Inference(#[from] InferenceError),

    /// `ask` was called before `initialize`.
    #[error("Inference gateway is not initialized")]
    NotInitialized,
}

impl GatewayError {
    /// Returns true if this is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Error raised when a stage result would break the ordering invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageOrderError {
    /// The result belongs to a different stage than the one expected next.
    #[error("Stage result out of order: expected stage {expected}, got stage {actual}")]
    OutOfOrder {
        /// The next expected stage.
        expected: u8,
        /// The stage carried by the result.
        actual: u8,
    },

    /// All stages already have results.
    #[error("Session already holds results for every stage")]
    Full,

    /// The session is not in an analyzing state.
    #[error("Cannot record a stage result while the session is {state}")]
    NotAnalyzing {
        /// State of the session when the result arrived.
        state: SessionState,
    },

    /// The result was produced for an earlier session generation.
    #[error("Stale result from generation {result_generation} (session is at {session_generation})")]
    Stale {
        /// Generation the result was produced under.
        result_generation: u64,
        /// Generation of the live session.
        session_generation: u64,
    },
}

impl StageOrderError {
    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        match self {
            Self::OutOfOrder { expected, actual } => {
                map.insert("type".to_string(), serde_json::json!("OutOfOrder"));
                map.insert("expected".to_string(), serde_json::json!(expected));
                map.insert("actual".to_string(), serde_json::json!(actual));
            }
            Self::Full => {
                map.insert("type".to_string(), serde_json::json!("Full"));
            }
            Self::NotAnalyzing { state } => {
                map.insert("type".to_string(), serde_json::json!("NotAnalyzing"));
                map.insert("state".to_string(), serde_json::json!(state.to_string()));
            }
            Self::Stale {
                result_generation,
                session_generation,
            } => {
                map.insert("type".to_string(), serde_json::json!("Stale"));
                map.insert("result_generation".to_string(), serde_json::json!(result_generation));
                map.insert("session_generation".to_string(), serde_json::json!(session_generation));
            }
        }
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Why a single stage failed. Stored on the stage result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StageFailure {
    /// The photo could not be preprocessed.
    Preprocess(String),
    /// The model call exceeded its time ceiling.
    TimedOut(String),
    /// The model call failed.
    Inference(String),
}

impl StageFailure {
    /// Short label used in report markers.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Preprocess(_) => "image unusable",
            Self::TimedOut(_) => "timed out",
            Self::Inference(_) => "inference failed",
        }
    }

    /// The detail message.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Preprocess(d) | Self::TimedOut(d) | Self::Inference(d) => d,
        }
    }
}

impl From<&PreprocessError> for StageFailure {
    fn from(err: &PreprocessError) -> Self {
        Self::Preprocess(err.to_string())
    }
}

impl From<&GatewayError> for StageFailure {
    fn from(err: &GatewayError) -> Self {
        match err {
            GatewayError::Timeout { .. } => Self::TimedOut(err.to_string()),
            GatewayError::Inference(_) | GatewayError::NotInitialized => {
                Self::Inference(err.to_string())
            }
        }
    }
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.label(), self.detail())
    }
}
