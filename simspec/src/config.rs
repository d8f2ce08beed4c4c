//! Runtime configuration for the analysis pipeline.
//!
//! All fields carry serde defaults, so a partial JSON file only needs to
//! name the values it overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::SimspecError;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimspecConfig {
    /// Location of the vision-language model asset.
    #[serde(default = "default_model_asset_path")]
    pub model_asset_path: PathBuf,
    /// Width of the frame handed to the model.
    #[serde(default = "default_target_size")]
    pub target_width: u32,
    /// Height of the frame handed to the model.
    #[serde(default = "default_target_size")]
    pub target_height: u32,
    /// Characters after which the gateway stops consuming model output.
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
    /// Hard cap on streamed chunks per call.
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    /// Wall-clock ceiling per model call, in seconds.
    #[serde(default = "default_ask_timeout")]
    pub ask_timeout_seconds: f64,
    /// Subject noun used when no prior stage yields one.
    #[serde(default = "default_placeholder_subject")]
    pub placeholder_subject: String,
}

fn default_model_asset_path() -> PathBuf {
    PathBuf::from("models/vision-language.bundle")
}

fn default_target_size() -> u32 {
    512
}

fn default_max_output_chars() -> usize {
    600
}

fn default_max_chunks() -> usize {
    512
}

fn default_ask_timeout() -> f64 {
    30.0
}

fn default_placeholder_subject() -> String {
    "mechanical component".to_string()
}

impl Default for SimspecConfig {
    fn default() -> Self {
        Self {
            model_asset_path: default_model_asset_path(),
            target_width: default_target_size(),
            target_height: default_target_size(),
            max_output_chars: default_max_output_chars(),
            max_chunks: default_max_chunks(),
            ask_timeout_seconds: default_ask_timeout(),
            placeholder_subject: default_placeholder_subject(),
        }
    }
}

impl SimspecConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, SimspecError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration from a JSON file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimspecError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Sets the model asset path.
    #[must_use]
    pub fn with_model_asset_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_asset_path = path.into();
        self
    }

    /// Sets the target frame size.
    #[must_use]
    pub fn with_target_size(mut self, width: u32, height: u32) -> Self {
        self.target_width = width;
        self.target_height = height;
        self
    }

    /// Sets the output length cap.
    #[must_use]
    pub fn with_max_output_chars(mut self, chars: usize) -> Self {
        self.max_output_chars = chars;
        self
    }

    /// Sets the chunk cap.
    #[must_use]
    pub fn with_max_chunks(mut self, chunks: usize) -> Self {
        self.max_chunks = chunks;
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn with_ask_timeout(mut self, timeout: Duration) -> Self {
        self.ask_timeout_seconds = timeout.as_secs_f64();
        self
    }

    /// Sets the placeholder subject noun.
    #[must_use]
    pub fn with_placeholder_subject(mut self, subject: impl Into<String>) -> Self {
        self.placeholder_subject = subject.into();
        self
    }

    /// Gets the per-call timeout as a Duration.
    ///
    /// A value that is not a valid duration yields the default timeout;
    /// [`Self::validate`] reports it.
    #[must_use]
    pub fn ask_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.ask_timeout_seconds)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_ask_timeout()))
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), SimspecError> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(SimspecError::Config(format!(
                "target size must be non-zero, got {}x{}",
                self.target_width, self.target_height
            )));
        }
        if self.max_output_chars == 0 {
            return Err(SimspecError::Config("max_output_chars must be non-zero".to_string()));
        }
        if self.max_chunks == 0 {
            return Err(SimspecError::Config("max_chunks must be non-zero".to_string()));
        }
        if !self.ask_timeout_seconds.is_finite() || self.ask_timeout_seconds <= 0.0 {
            return Err(SimspecError::Config(format!(
                "ask_timeout_seconds must be positive, got {}",
                self.ask_timeout_seconds
            )));
        }
        if self.placeholder_subject.trim().is_empty() {
            return Err(SimspecError::Config("placeholder_subject must not be empty".to_string()));
        }
        Ok(())
    }

    /// The subset of settings the inference gateway needs.
    #[must_use]
    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            model_asset_path: self.model_asset_path.clone(),
            max_chunks: self.max_chunks,
            ask_timeout: self.ask_timeout(),
        }
    }

    /// The subset of settings the orchestrator needs.
    #[must_use]
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            target_width: self.target_width,
            target_height: self.target_height,
            max_output_chars: self.max_output_chars,
            placeholder_subject: self.placeholder_subject.clone(),
        }
    }
}

/// Settings owned by the inference gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Location of the model asset.
    pub model_asset_path: PathBuf,
    /// Hard cap on streamed chunks per call.
    pub max_chunks: usize,
    /// Wall-clock ceiling per call.
    pub ask_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        SimspecConfig::default().gateway()
    }
}

/// Settings owned by the stage orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Width of the frame handed to the model.
    pub target_width: u32,
    /// Height of the frame handed to the model.
    pub target_height: u32,
    /// Characters after which model output is cut off.
    pub max_output_chars: usize,
    /// Subject noun used when no prior stage yields one.
    pub placeholder_subject: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        SimspecConfig::default().orchestrator()
    }
}
