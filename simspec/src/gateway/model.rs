//! Vendor-facing model traits.
//!
//! A vision-language SDK plugs in by implementing these three traits. The
//! gateway never talks to the SDK any other way.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::path::Path;
use std::sync::Arc;

use crate::errors::{InferenceError, ModelLoadError};
use crate::preprocess::PreparedFrame;

/// One item of streamed model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChunk {
    /// A fragment of generated text.
    Text(String),
    /// The model finished generating.
    Complete,
}

impl ModelChunk {
    /// Creates a text chunk.
    #[must_use]
    pub fn text(fragment: impl Into<String>) -> Self {
        Self::Text(fragment.into())
    }
}

/// Loads model assets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Loads the asset at `asset_path`.
    ///
    /// Fails with [`ModelLoadError::Missing`] when nothing is at the path and
    /// [`ModelLoadError::Incompatible`] when the runtime cannot use it.
    async fn load(&self, asset_path: &Path) -> Result<Arc<dyn LoadedModel>, ModelLoadError>;
}

/// A model held in memory, able to open conversation sessions.
pub trait LoadedModel: Send + Sync {
    /// Human-readable model name for logs.
    fn name(&self) -> &str;

    /// Opens a session with no conversational context.
    fn open_session(&self) -> Box<dyn ModelSession>;
}

/// A conversation with the model.
pub trait ModelSession: Send {
    /// Streams the answer to `prompt` about `frame`.
    ///
    /// The stream ends after [`ModelChunk::Complete`] or when the model has
    /// nothing more to say; a degenerate model may never end it.
    fn generate<'a>(
        &'a mut self,
        frame: &'a PreparedFrame,
        prompt: &'a str,
    ) -> BoxStream<'a, Result<ModelChunk, InferenceError>>;
}
