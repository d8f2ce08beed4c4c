//! # SimSpec
//!
//! A progressive multi-stage analysis orchestrator for on-device
//! vision-language models.
//!
//! SimSpec takes three photographs of a mechanical component, asks the model
//! a staged question about each one, and turns the answers into a
//! "simulation scoping" report:
//!
//! - **Image preprocessing**: raw captured buffers become fixed-size RGB frames
//! - **Inference gateway**: one owned model session with streaming, timeouts
//!   and output caps
//! - **Stage orchestration**: a strict three-stage state machine with context
//!   carried between stages, per-stage failure isolation and reset/cancel
//! - **Classification**: ordered keyword tables mapping model text to an
//!   analysis category and confidence level
//! - **Reporting**: a deterministic text report plus run metrics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use simspec::prelude::*;
//! use std::sync::Arc;
//!
//! let config = SimspecConfig::from_json_file("simspec.json")?;
//! let gateway = Arc::new(InferenceGateway::new(runtime, config.gateway()));
//! let orchestrator = StageOrchestrator::new(gateway, config.orchestrator())
//!     .with_event_sink(Arc::new(LoggingEventSink::default()));
//!
//! let session = orchestrator.analyze(photos).await?;
//! println!("{}", report::assemble(&session));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]

pub mod cancellation;
pub mod classify;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod orchestrator;
pub mod preprocess;
pub mod prompts;
pub mod report;
pub mod session;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::classify::{
        classify, derive_context, follow_up_question, AnalysisCategory, Classification,
        ConfidenceLevel, ContextCarry, FollowUpQuestion,
    };
    pub use crate::config::{GatewayConfig, OrchestratorConfig, SimspecConfig};
    pub use crate::core::{SessionEvent, SessionState, StageIndex, STAGE_COUNT};
    pub use crate::errors::{
        GatewayError, InferenceError, ModelLoadError, PreprocessError, SimspecError,
        StageFailure, StageOrderError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::gateway::{
        InferenceGateway, LoadedModel, ModelChunk, ModelReply, ModelRuntime, ModelSession,
        StopReason,
    };
    pub use crate::orchestrator::StageOrchestrator;
    pub use crate::preprocess::{ImagePreprocessor, Photo, PixelFormat, PreparedFrame, SensorRotation};
    pub use crate::prompts::{StagePrompt, STAGE_PROMPTS};
    pub use crate::report::{self, SessionMetrics};
    pub use crate::session::{AnalysisSession, StageOutcome, StageResult};
}
