//! Inference gateway.
//!
//! Owns the single model session and exposes one operation, [`InferenceGateway::ask`],
//! which streams the model's answer about an image and stops on completion,
//! on the output length cap, on the chunk cap, or at the wall-clock ceiling.
//!
//! The gateway is constructed once and shared by `Arc`; there is no global
//! model state.

mod model;

pub use model::{LoadedModel, ModelChunk, ModelRuntime, ModelSession};

#[cfg(test)]
pub use model::MockModelRuntime;

use futures::StreamExt;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::errors::{GatewayError, InferenceError, ModelLoadError};
use crate::preprocess::PreparedFrame;

/// Why the gateway stopped consuming a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model sent [`ModelChunk::Complete`].
    Completed,
    /// The stream ended without an explicit completion.
    StreamEnded,
    /// Accumulated text reached the output cap.
    LengthCap,
    /// The chunk cap was reached.
    ChunkCap,
}

/// Text collected from one model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    /// Concatenated text chunks.
    pub text: String,
    /// Number of text chunks consumed.
    pub chunks: usize,
    /// Why consumption stopped.
    pub stop_reason: StopReason,
    /// Wall-clock time spent in the call.
    pub elapsed: Duration,
}

/// Gateway to the on-device vision-language model.
pub struct InferenceGateway {
    runtime: Arc<dyn ModelRuntime>,
    config: GatewayConfig,
    model: AsyncMutex<Option<Arc<dyn LoadedModel>>>,
    session: AsyncMutex<Option<Box<dyn ModelSession>>>,
    load_time: Mutex<Option<Duration>>,
}

impl InferenceGateway {
    /// Creates a gateway over `runtime`. Nothing is loaded until [`Self::initialize`].
    #[must_use]
    pub fn new(runtime: Arc<dyn ModelRuntime>, config: GatewayConfig) -> Self {
        Self {
            runtime,
            config,
            model: AsyncMutex::new(None),
            session: AsyncMutex::new(None),
            load_time: Mutex::new(None),
        }
    }

    /// The gateway configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Loads the model asset.
    ///
    /// Idempotent: once a model is loaded, further calls return `Ok(())`
    /// without touching the runtime. Concurrent callers load at most once.
    pub async fn initialize(&self) -> Result<(), ModelLoadError> {
        let mut model = self.model.lock().await;
        if model.is_some() {
            debug!("Inference gateway already initialized");
            return Ok(());
        }

        let path = &self.config.model_asset_path;
        let started = Instant::now();
        let loaded = self.runtime.load(path).await.map_err(|err| {
            warn!(asset = %path.display(), error = %err, "Model load failed");
            err
        })?;
        let elapsed = started.elapsed();

        info!(
            asset = %path.display(),
            model = loaded.name(),
            load_ms = elapsed.as_millis() as u64,
            "Model loaded"
        );
        *self.load_time.lock() = Some(elapsed);
        *model = Some(loaded);
        Ok(())
    }

    /// Returns true once a model has been loaded.
    pub async fn is_initialized(&self) -> bool {
        self.model.lock().await.is_some()
    }

    /// How long the model took to load, if it has been loaded.
    #[must_use]
    pub fn model_load_time(&self) -> Option<Duration> {
        *self.load_time.lock()
    }

    /// Asks the model about `frame` and returns the collected text.
    pub async fn ask(
        &self,
        frame: &PreparedFrame,
        prompt: &str,
        max_output_chars: usize,
    ) -> Result<String, GatewayError> {
        self.ask_detailed(frame, prompt, max_output_chars)
            .await
            .map(|reply| reply.text)
    }

    /// Like [`Self::ask`] but also reports chunk count, stop reason and timing.
    ///
    /// The chunk that crosses `max_output_chars` is kept whole, so the text
    /// may exceed the cap by less than one chunk. A timed out or failed call
    /// discards the session.
    pub async fn ask_detailed(
        &self,
        frame: &PreparedFrame,
        prompt: &str,
        max_output_chars: usize,
    ) -> Result<ModelReply, GatewayError> {
        let model = self
            .model
            .lock()
            .await
            .clone()
            .ok_or(GatewayError::NotInitialized)?;

        let mut session = self.session.lock().await;
        let ceiling = self.config.ask_timeout;
        let max_chunks = self.config.max_chunks;
        let started = Instant::now();

        let active = session.get_or_insert_with(|| model.open_session());
        let outcome = timeout(
            ceiling,
            collect(active.as_mut(), frame, prompt, max_output_chars, max_chunks),
        )
        .await;

        match outcome {
            Ok(Ok((text, chunks, stop_reason))) => {
                let elapsed = started.elapsed();
                debug!(
                    chunks,
                    chars = text.chars().count(),
                    stop_reason = ?stop_reason,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Model call finished"
                );
                Ok(ModelReply {
                    text,
                    chunks,
                    stop_reason,
                    elapsed,
                })
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Model call failed, discarding session");
                *session = None;
                Err(GatewayError::Inference(err))
            }
            Err(_) => {
                warn!(timeout_s = ceiling.as_secs_f64(), "Model call timed out, discarding session");
                *session = None;
                Err(GatewayError::Timeout { after: ceiling })
            }
        }
    }

    /// Discards any conversational context so the next call starts clean.
    pub async fn reset(&self) {
        if self.session.lock().await.take().is_some() {
            debug!("Model session discarded");
        }
    }
}

impl fmt::Debug for InferenceGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceGateway")
            .field("config", &self.config)
            .field("load_time", &self.model_load_time())
            .finish_non_exhaustive()
    }
}

async fn collect(
    session: &mut dyn ModelSession,
    frame: &PreparedFrame,
    prompt: &str,
    max_output_chars: usize,
    max_chunks: usize,
) -> Result<(String, usize, StopReason), InferenceError> {
    let mut stream = session.generate(frame, prompt);
    let mut text = String::new();
    let mut chars = 0usize;
    let mut chunks = 0usize;

    while let Some(item) = stream.next().await {
        match item? {
            ModelChunk::Complete => return Ok((text, chunks, StopReason::Completed)),
            ModelChunk::Text(fragment) => {
                chunks += 1;
                chars += fragment.chars().count();
                text.push_str(&fragment);
                if chars >= max_output_chars {
                    return Ok((text, chunks, StopReason::LengthCap));
                }
                if chunks >= max_chunks {
                    return Ok((text, chunks, StopReason::ChunkCap));
                }
            }
        }
    }

    Ok((text, chunks, StopReason::StreamEnded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageIndex;
    use crate::testing::{MockVisionRuntime, ScriptedReply};
    use std::path::PathBuf;

    fn frame() -> PreparedFrame {
        PreparedFrame {
            source: StageIndex::FIRST,
            width: 2,
            height: 2,
            rgb: vec![0; 12],
        }
    }

    fn gateway(runtime: &MockVisionRuntime, config: GatewayConfig) -> InferenceGateway {
        InferenceGateway::new(Arc::new(runtime.clone()), config)
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let runtime = MockVisionRuntime::new();
        let gateway = gateway(&runtime, GatewayConfig::default());

        gateway.initialize().await.unwrap();
        gateway.initialize().await.unwrap();

        assert_eq!(runtime.load_count(), 1);
        assert!(gateway.is_initialized().await);
        assert!(gateway.model_load_time().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_initialize_loads_once() {
        let runtime = MockVisionRuntime::new().with_load_delay(Duration::from_millis(20));
        let gateway = gateway(&runtime, GatewayConfig::default());

        let (a, b) = tokio::join!(gateway.initialize(), gateway.initialize());
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(runtime.load_count(), 1);
    }

    #[tokio::test]
    async fn test_initialize_missing_asset() {
        let runtime = MockVisionRuntime::new().with_missing_asset();
        let gateway = gateway(&runtime, GatewayConfig::default());

        let err = gateway.initialize().await.unwrap_err();
        assert!(matches!(err, ModelLoadError::Missing { .. }));
        assert!(!gateway.is_initialized().await);
    }

    #[tokio::test]
    async fn test_initialize_passes_configured_path() {
        let mut runtime = MockModelRuntime::new();
        runtime
            .expect_load()
            .withf(|path| path.to_str() == Some("/assets/vlm.bundle"))
            .times(1)
            .returning(|path| {
                Err(ModelLoadError::incompatible(path.to_path_buf(), "unsupported quantization"))
            });

        let config = GatewayConfig {
            model_asset_path: PathBuf::from("/assets/vlm.bundle"),
            ..GatewayConfig::default()
        };
        let gateway = InferenceGateway::new(Arc::new(runtime), config);

        let err = gateway.initialize().await.unwrap_err();
        assert!(err.to_string().contains("unsupported quantization"));
    }

    #[tokio::test]
    async fn test_ask_before_initialize() {
        let runtime = MockVisionRuntime::new();
        let gateway = gateway(&runtime, GatewayConfig::default());

        let err = gateway.ask(&frame(), "Describe", 100).await.unwrap_err();
        assert_eq!(err, GatewayError::NotInitialized);
        assert_eq!(runtime.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ask_concatenates_until_complete() {
        let runtime = MockVisionRuntime::new().with_reply(ScriptedReply::chunks(["A welded ", "steel ", "bracket."]));
        let gateway = gateway(&runtime, GatewayConfig::default());
        gateway.initialize().await.unwrap();

        let reply = gateway.ask_detailed(&frame(), "Describe", 1000).await.unwrap();
        assert_eq!(reply.text, "A welded steel bracket.");
        assert_eq!(reply.chunks, 3);
        assert_eq!(reply.stop_reason, StopReason::Completed);
        assert_eq!(runtime.recorded_prompts(), vec!["Describe".to_string()]);
    }

    #[tokio::test]
    async fn test_endless_stream_stops_at_length_cap() {
        let runtime = MockVisionRuntime::new().with_reply(ScriptedReply::endless("corroded flange "));
        let gateway = gateway(&runtime, GatewayConfig::default());
        gateway.initialize().await.unwrap();

        let reply = gateway.ask_detailed(&frame(), "Describe", 300).await.unwrap();
        let chars = reply.text.chars().count();
        assert!(chars >= 300);
        assert!(chars < 300 + "corroded flange ".len());
        assert_eq!(reply.stop_reason, StopReason::LengthCap);
    }

    #[tokio::test]
    async fn test_endless_stream_stops_at_chunk_cap() {
        let runtime = MockVisionRuntime::new().with_reply(ScriptedReply::endless(""));
        let config = GatewayConfig {
            max_chunks: 50,
            ..GatewayConfig::default()
        };
        let gateway = gateway(&runtime, config);
        gateway.initialize().await.unwrap();

        let reply = gateway.ask_detailed(&frame(), "Describe", 300).await.unwrap();
        assert_eq!(reply.chunks, 50);
        assert_eq!(reply.stop_reason, StopReason::ChunkCap);
        assert!(reply.text.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_model_times_out() {
        let runtime = MockVisionRuntime::new().with_reply(ScriptedReply::Stall);
        let config = GatewayConfig {
            ask_timeout: Duration::from_secs(30),
            ..GatewayConfig::default()
        };
        let gateway = gateway(&runtime, config);
        gateway.initialize().await.unwrap();

        let err = gateway.ask(&frame(), "Describe", 300).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(
            err,
            GatewayError::Timeout {
                after: Duration::from_secs(30)
            }
        );
    }

    #[tokio::test]
    async fn test_model_error_is_inference_error() {
        let runtime = MockVisionRuntime::new().with_reply(ScriptedReply::fail("accelerator lost"));
        let gateway = gateway(&runtime, GatewayConfig::default());
        gateway.initialize().await.unwrap();

        let err = gateway.ask(&frame(), "Describe", 300).await.unwrap_err();
        assert_eq!(err, GatewayError::Inference(InferenceError::new("accelerator lost")));
    }

    #[tokio::test]
    async fn test_reset_opens_fresh_session() {
        let runtime = MockVisionRuntime::new()
            .with_reply(ScriptedReply::text("first"))
            .with_reply(ScriptedReply::text("second"))
            .with_reply(ScriptedReply::text("third"));
        let gateway = gateway(&runtime, GatewayConfig::default());
        gateway.initialize().await.unwrap();

        gateway.ask(&frame(), "one", 100).await.unwrap();
        gateway.ask(&frame(), "two", 100).await.unwrap();
        assert_eq!(runtime.sessions_opened(), 1);

        gateway.reset().await;
        gateway.ask(&frame(), "three", 100).await.unwrap();
        assert_eq!(runtime.sessions_opened(), 2);
    }
}
