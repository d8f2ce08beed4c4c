//! Photo fixtures and a mock-backed orchestrator rig.

use std::sync::Arc;

use crate::config::SimspecConfig;
use crate::core::StageIndex;
use crate::events::{CollectingEventSink, EventSink};
use crate::gateway::InferenceGateway;
use crate::orchestrator::StageOrchestrator;
use crate::preprocess::{PixelFormat, Photo};

use super::mocks::MockVisionRuntime;

const FIXTURE_SIZE: u32 = 16;

/// A small solid-colour RGB photo for `index`. Each index gets its own colour.
#[must_use]
pub fn test_photo(index: StageIndex) -> Photo {
    let shade = 60 * index.get();
    let pixel = [shade, 255 - shade, 128];
    let pixels: Vec<u8> = pixel
        .iter()
        .copied()
        .cycle()
        .take((FIXTURE_SIZE * FIXTURE_SIZE) as usize * pixel.len())
        .collect();
    Photo::new(index, FIXTURE_SIZE, FIXTURE_SIZE, PixelFormat::Rgb8, pixels)
}

/// Three photos in capture order.
#[must_use]
pub fn test_photos() -> [Photo; 3] {
    StageIndex::all().map(test_photo)
}

/// An orchestrator wired to a [`MockVisionRuntime`] and a collecting sink.
///
/// The rig keeps a handle on the runtime so tests can script replies and
/// inspect calls after handing it to the gateway.
pub struct TestRig {
    /// The scripted runtime.
    pub runtime: MockVisionRuntime,
    /// Events emitted by the orchestrator.
    pub events: Arc<CollectingEventSink>,
    /// The orchestrator under test.
    pub orchestrator: Arc<StageOrchestrator>,
}

impl TestRig {
    /// Builds a rig with the default configuration.
    #[must_use]
    pub fn new(runtime: MockVisionRuntime) -> Self {
        Self::with_config(runtime, &SimspecConfig::default())
    }

    /// Builds a rig with `config`.
    #[must_use]
    pub fn with_config(runtime: MockVisionRuntime, config: &SimspecConfig) -> Self {
        let gateway = Arc::new(InferenceGateway::new(
            Arc::new(runtime.clone()),
            config.gateway(),
        ));
        let events = Arc::new(CollectingEventSink::new());
        let sink: Arc<dyn EventSink> = events.clone();
        let orchestrator = Arc::new(
            StageOrchestrator::new(gateway, config.orchestrator()).with_event_sink(sink),
        );
        Self {
            runtime,
            events,
            orchestrator,
        }
    }

    /// Starts a session and submits the three fixture photos.
    pub fn capture_all(&self) -> Result<(), crate::errors::SimspecError> {
        self.orchestrator.start()?;
        for photo in test_photos() {
            self.orchestrator.submit_photo(photo)?;
        }
        Ok(())
    }
}
