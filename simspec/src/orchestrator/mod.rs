//! Stage orchestrator.
//!
//! Drives one [`AnalysisSession`] through photo capture and the three
//! analysis stages:
//!
//! ```text
//! Idle -> CapturingPhoto(1..3) -> Analyzing(1) -> Analyzing(2) -> Analyzing(3) -> Complete
//!                                       \-> Failed (model could not be loaded)
//! ```
//!
//! Stages run strictly one after another. A stage that fails (unusable
//! photo, model error, timeout) is recorded as a failed result and the run
//! moves on; only a model load failure fails the session.
//!
//! [`StageOrchestrator::reset`] may be called at any time, from any task. It
//! swaps in a fresh idle session under a new generation and cancels the
//! in-flight model call. Results that arrive for the old generation are
//! rejected by the session and dropped.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancellation::CancellationToken;
use crate::classify::derive_context;
use crate::config::OrchestratorConfig;
use crate::core::{SessionEvent, SessionState, StageIndex};
use crate::errors::{ModelLoadError, SimspecError, StageFailure, StageOrderError};
use crate::events::{EventSink, NoOpEventSink};
use crate::gateway::InferenceGateway;
use crate::preprocess::{ImagePreprocessor, Photo};
use crate::prompts::build_prompt;
use crate::report;
use crate::session::{AnalysisSession, StageResult};

const RESET_REASON: &str = "session reset";

/// What happened to one stage's model call.
enum StageRun {
    Answered(String),
    Failed(StageFailure),
    Cancelled,
}

/// Runs analysis sessions against a shared [`InferenceGateway`].
pub struct StageOrchestrator {
    gateway: Arc<InferenceGateway>,
    preprocessor: ImagePreprocessor,
    config: OrchestratorConfig,
    session: Mutex<AnalysisSession>,
    cancel: Mutex<Arc<CancellationToken>>,
    generation: AtomicU64,
    run_lock: AsyncMutex<()>,
    events: Arc<dyn EventSink>,
}

impl StageOrchestrator {
    /// Creates an orchestrator with an idle session.
    #[must_use]
    pub fn new(gateway: Arc<InferenceGateway>, config: OrchestratorConfig) -> Self {
        Self {
            gateway,
            preprocessor: ImagePreprocessor::new(config.target_width, config.target_height),
            config,
            session: Mutex::new(AnalysisSession::new(0)),
            cancel: Mutex::new(Arc::new(CancellationToken::new())),
            generation: AtomicU64::new(0),
            run_lock: AsyncMutex::new(()),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the sink that receives lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// The shared gateway.
    #[must_use]
    pub fn gateway(&self) -> &Arc<InferenceGateway> {
        &self.gateway
    }

    /// The orchestrator configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The current generation. Bumped by every reset.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Begins photo capture: `Idle -> CapturingPhoto(1)`.
    pub fn start(&self) -> Result<Uuid, SimspecError> {
        let (id, generation) = {
            let mut session = self.session.lock();
            session.begin_capture()?;
            (session.id(), session.generation())
        };
        info!(session_id = %id, generation, "Session started");
        self.events
            .try_emit(SessionEvent::session_started(&id.to_string(), generation));
        Ok(id)
    }

    /// Accepts the next photo in capture order.
    ///
    /// Returns the new state: the next capture slot, or `Analyzing(1)`
    /// after the third photo.
    pub fn submit_photo(&self, photo: Photo) -> Result<SessionState, SimspecError> {
        let index = photo.index();
        let (id, state) = {
            let mut session = self.session.lock();
            let state = session.push_photo(photo)?;
            (session.id(), state)
        };
        debug!(session_id = %id, photo = index.get(), state = %state, "Photo captured");
        self.events
            .try_emit(SessionEvent::photo_captured(&id.to_string(), index));
        Ok(state)
    }

    /// Runs the three analysis stages and returns the finished session.
    ///
    /// Requires `Analyzing(1)` with no recorded results. Returns
    /// [`SimspecError::Cancelled`] if the session is reset while running
    /// and [`SimspecError::ModelLoad`] if the model cannot be loaded, in
    /// which case the session is `Failed`. Stage failures do not fail the run.
    pub async fn run(&self) -> Result<AnalysisSession, SimspecError> {
        let _running = self
            .run_lock
            .try_lock()
            .map_err(|_| SimspecError::AlreadyRunning)?;

        let (id, generation, photos, token) = {
            let session = self.session.lock();
            if session.state() != SessionState::Analyzing(StageIndex::FIRST)
                || !session.results().is_empty()
            {
                return Err(SimspecError::invalid_transition("run", session.state()));
            }
            (
                session.id(),
                session.generation(),
                session.photos().to_vec(),
                Arc::clone(&*self.cancel.lock()),
            )
        };
        let session_id = id.to_string();

        let loaded = tokio::select! {
            biased;
            () = token.cancelled() => return Err(cancelled_error(&token)),
            loaded = self.gateway.initialize() => loaded,
        };
        if let Err(err) = loaded {
            self.fail_session(generation, &session_id, &err);
            return Err(err.into());
        }

        info!(session_id = %session_id, generation, "Analysis started");
        for stage in StageIndex::all() {
            let carry = {
                let session = self.session.lock();
                if session.generation() != generation {
                    return Err(cancelled_error(&token));
                }
                self.context_carry(stage, session.results())
            };
            let prompt = build_prompt(stage, &carry);

            self.events
                .try_emit(SessionEvent::stage_started(&session_id, stage));
            debug!(session_id = %session_id, stage = stage.get(), prompt = %prompt, "Stage started");

            let started = Instant::now();
            let outcome = self
                .run_stage(photos.get(stage.position()), stage, &prompt, &token)
                .await;
            let elapsed = started.elapsed();

            let result = match outcome {
                StageRun::Answered(text) => StageResult::succeeded(stage, prompt, text, elapsed),
                StageRun::Failed(failure) => StageResult::failed(stage, prompt, failure, elapsed),
                StageRun::Cancelled => {
                    self.gateway.reset().await;
                    info!(session_id = %session_id, stage = stage.get(), "Analysis cancelled");
                    return Err(cancelled_error(&token));
                }
            };
            self.record(generation, &session_id, result)
                .map_err(|err| match err {
                    SimspecError::StageOrder(StageOrderError::Stale { .. }) => cancelled_error(&token),
                    other => other,
                })?;
        }

        let snapshot = self.snapshot();
        if snapshot.generation() != generation {
            return Err(cancelled_error(&token));
        }
        let failed = snapshot.failed_stages();
        info!(session_id = %session_id, failed_stages = failed, "Analysis complete");
        self.events
            .try_emit(SessionEvent::session_completed(&session_id, failed));
        Ok(snapshot)
    }

    /// Starts a session, submits `photos` in order and runs it.
    ///
    /// A finished session is reset first; a session still capturing or
    /// analyzing is left alone and the call fails.
    pub async fn analyze<I>(&self, photos: I) -> Result<AnalysisSession, SimspecError>
    where
        I: IntoIterator<Item = Photo>,
    {
        if self.state().is_terminal() {
            self.reset();
        }
        self.start()?;
        for photo in photos {
            self.submit_photo(photo)?;
        }
        self.run().await
    }

    /// Cancels any in-flight run and replaces the session with a fresh idle one.
    ///
    /// Returns the new session id.
    pub fn reset(&self) -> Uuid {
        let (generation, id, previous, stale_token) = {
            let mut session = self.session.lock();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let fresh = AnalysisSession::new(generation);
            let id = fresh.id();
            let previous = std::mem::replace(&mut *session, fresh);
            let stale_token =
                std::mem::replace(&mut *self.cancel.lock(), Arc::new(CancellationToken::new()));
            (generation, id, previous, stale_token)
        };
        stale_token.cancel(RESET_REASON);

        info!(
            previous_session_id = %previous.id(),
            session_id = %id,
            generation,
            "Session reset"
        );
        self.events
            .try_emit(SessionEvent::session_reset(&previous.id().to_string(), generation));
        id
    }

    /// A copy of the current session.
    #[must_use]
    pub fn snapshot(&self) -> AnalysisSession {
        self.session.lock().clone()
    }

    /// The current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.lock().state()
    }

    /// Assembles the report for the current session.
    #[must_use]
    pub fn report(&self) -> String {
        report::assemble(&self.session.lock())
    }

    fn context_carry(&self, stage: StageIndex, prior: &[StageResult]) -> String {
        if stage == StageIndex::FIRST {
            return String::new();
        }
        let carry = derive_context(prior, &self.config.placeholder_subject);
        if carry.is_placeholder() {
            debug!(stage = stage.get(), subject = %carry.subject, "No subject from earlier stages, using placeholder");
        }
        carry.phrase()
    }

    async fn run_stage(
        &self,
        photo: Option<&Photo>,
        stage: StageIndex,
        prompt: &str,
        token: &CancellationToken,
    ) -> StageRun {
        let Some(photo) = photo else {
            return StageRun::Failed(StageFailure::Preprocess(format!(
                "photo {stage} was not captured"
            )));
        };
        let frame = match self.preprocessor.preprocess(photo) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(stage = stage.get(), error = %err, "Photo could not be preprocessed");
                return StageRun::Failed(StageFailure::from(&err));
            }
        };

        self.gateway.reset().await;
        tokio::select! {
            biased;
            () = token.cancelled() => StageRun::Cancelled,
            reply = self.gateway.ask(&frame, prompt, self.config.max_output_chars) => match reply {
                Ok(text) => StageRun::Answered(text),
                Err(err) => {
                    warn!(stage = stage.get(), error = %err, "Model call failed");
                    StageRun::Failed(StageFailure::from(&err))
                }
            },
        }
    }

    fn record(
        &self,
        generation: u64,
        session_id: &str,
        result: StageResult,
    ) -> Result<(), SimspecError> {
        let stage = result.stage;
        let elapsed_ms = result.elapsed_ms;
        let event = match result.failure() {
            None => SessionEvent::stage_completed(
                session_id,
                stage,
                elapsed_ms,
                result.classification.category.label(),
            ),
            Some(failure) => SessionEvent::stage_failed(session_id, stage, elapsed_ms, &failure.to_string()),
        };
        let succeeded = result.is_success();

        if let Err(err) = self.session.lock().record(generation, result) {
            debug!(session_id = %session_id, stage = stage.get(), error = %err, "Discarding stage result");
            return Err(err.into());
        }

        if succeeded {
            info!(session_id = %session_id, stage = stage.get(), elapsed_ms, "Stage completed");
        } else {
            warn!(session_id = %session_id, stage = stage.get(), elapsed_ms, "Stage failed");
        }
        self.events.try_emit(event);
        Ok(())
    }

    fn fail_session(&self, generation: u64, session_id: &str, err: &ModelLoadError) {
        {
            let mut session = self.session.lock();
            if session.generation() != generation {
                return;
            }
            session.fail();
        }
        warn!(session_id = %session_id, error = %err, "Session failed");
        self.events
            .try_emit(SessionEvent::session_failed(session_id, &err.to_string()));
    }
}

impl std::fmt::Debug for StageOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageOrchestrator")
            .field("config", &self.config)
            .field("generation", &self.generation())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn cancelled_error(token: &CancellationToken) -> SimspecError {
    SimspecError::Cancelled(token.reason().unwrap_or_else(|| RESET_REASON.to_string()))
}
