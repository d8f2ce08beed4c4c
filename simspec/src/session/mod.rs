//! The analysis session aggregate.
//!
//! An [`AnalysisSession`] owns the captured photos, the ordered stage
//! results and the lifecycle state. All state transitions go through its
//! methods so the ordering invariants hold no matter who drives it:
//!
//! - photos arrive in capture order 1, 2, 3;
//! - results are appended in stage order and never exceed three;
//! - results are only accepted while the session is analyzing, so a
//!   terminal session stays terminal until it is replaced;
//! - a result tagged with another generation is rejected as stale.

mod result;

pub use result::{StageOutcome, StageResult};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{SessionState, StageIndex, STAGE_COUNT};
use crate::errors::{SimspecError, StageOrderError};
use crate::preprocess::Photo;
use crate::utils::{generate_session_id, now_utc, Timestamp};

/// One run of the pipeline, from first photo to report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSession {
    id: Uuid,
    generation: u64,
    created_at: Timestamp,
    state: SessionState,
    #[serde(skip)]
    photos: Vec<Photo>,
    results: Vec<StageResult>,
}

impl AnalysisSession {
    /// Creates an idle session for `generation`.
    #[must_use]
    pub fn new(generation: u64) -> Self {
        Self {
            id: generate_session_id(),
            generation,
            created_at: now_utc(),
            state: SessionState::Idle,
            photos: Vec::with_capacity(STAGE_COUNT),
            results: Vec::with_capacity(STAGE_COUNT),
        }
    }

    /// The session identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The generation this session belongs to.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the session was created.
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Captured photos in capture order.
    #[must_use]
    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    /// The photo for `stage`, if captured.
    #[must_use]
    pub fn photo(&self, stage: StageIndex) -> Option<&Photo> {
        self.photos.get(stage.position())
    }

    /// Recorded results in stage order.
    #[must_use]
    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    /// The result for `stage`, if recorded.
    #[must_use]
    pub fn result(&self, stage: StageIndex) -> Option<&StageResult> {
        self.results.get(stage.position())
    }

    /// The stage whose result is expected next.
    #[must_use]
    pub fn next_stage(&self) -> Option<StageIndex> {
        u8::try_from(self.results.len() + 1)
            .ok()
            .and_then(StageIndex::new)
    }

    /// Number of failed stages.
    #[must_use]
    pub fn failed_stages(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    /// Idle → CapturingPhoto(1).
    pub fn begin_capture(&mut self) -> Result<(), SimspecError> {
        if self.state != SessionState::Idle {
            return Err(SimspecError::invalid_transition("start", self.state));
        }
        self.state = SessionState::CapturingPhoto(StageIndex::FIRST);
        Ok(())
    }

    /// Accepts the photo the session is waiting for.
    ///
    /// After the third photo the session moves to `Analyzing(1)`.
    pub fn push_photo(&mut self, photo: Photo) -> Result<SessionState, SimspecError> {
        let SessionState::CapturingPhoto(expected) = self.state else {
            return Err(SimspecError::invalid_transition("submit_photo", self.state));
        };
        if photo.index() != expected {
            return Err(SimspecError::PhotoOutOfOrder {
                expected: expected.get(),
                actual: photo.index().get(),
            });
        }

        self.photos.push(photo);
        self.state = match expected.next() {
            Some(next) => SessionState::CapturingPhoto(next),
            None => SessionState::Analyzing(StageIndex::FIRST),
        };
        Ok(self.state)
    }

    /// Appends a stage result produced under `generation`.
    ///
    /// Stale results are reported before any state check. Advances to the
    /// next stage, or to `Complete` after the last one.
    pub fn record(&mut self, generation: u64, result: StageResult) -> Result<(), StageOrderError> {
        if generation != self.generation {
            return Err(StageOrderError::Stale {
                result_generation: generation,
                session_generation: self.generation,
            });
        }
        if self.next_stage().is_none() {
            return Err(StageOrderError::Full);
        }
        let SessionState::Analyzing(expected) = self.state else {
            return Err(StageOrderError::NotAnalyzing { state: self.state });
        };
        if result.stage != expected {
            return Err(StageOrderError::OutOfOrder {
                expected: expected.get(),
                actual: result.stage.get(),
            });
        }

        self.state = match result.stage.next() {
            Some(next) => SessionState::Analyzing(next),
            None => SessionState::Complete,
        };
        self.results.push(result);
        Ok(())
    }

    /// Marks the session as unable to run.
    pub fn fail(&mut self) {
        self.state = SessionState::Failed;
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageFailure;
    use crate::testing::test_photo;
    use std::time::Duration;

    fn stage(n: u8) -> StageIndex {
        StageIndex::new(n).unwrap()
    }

    fn ok_result(n: u8) -> StageResult {
        StageResult::succeeded(stage(n), "prompt", "a steel flange", Duration::from_millis(10))
    }

    fn ready_session() -> AnalysisSession {
        let mut session = AnalysisSession::new(0);
        session.begin_capture().unwrap();
        for n in 1..=3 {
            session.push_photo(test_photo(stage(n))).unwrap();
        }
        session
    }

    #[test]
    fn test_capture_flow() {
        let mut session = AnalysisSession::new(0);
        assert_eq!(session.state(), SessionState::Idle);

        session.begin_capture().unwrap();
        assert_eq!(session.state(), SessionState::CapturingPhoto(stage(1)));

        assert_eq!(
            session.push_photo(test_photo(stage(1))).unwrap(),
            SessionState::CapturingPhoto(stage(2))
        );
        session.push_photo(test_photo(stage(2))).unwrap();
        assert_eq!(
            session.push_photo(test_photo(stage(3))).unwrap(),
            SessionState::Analyzing(stage(1))
        );
        assert_eq!(session.photos().len(), 3);
    }

    #[test]
    fn test_begin_capture_twice_fails() {
        let mut session = AnalysisSession::new(0);
        session.begin_capture().unwrap();
        let err = session.begin_capture().unwrap_err();
        assert!(matches!(err, SimspecError::InvalidTransition { operation: "start", .. }));
    }

    #[test]
    fn test_photo_out_of_order() {
        let mut session = AnalysisSession::new(0);
        session.begin_capture().unwrap();
        let err = session.push_photo(test_photo(stage(2))).unwrap_err();
        assert!(matches!(err, SimspecError::PhotoOutOfOrder { expected: 1, actual: 2 }));
        assert!(session.photos().is_empty());
    }

    #[test]
    fn test_photo_rejected_when_idle() {
        let mut session = AnalysisSession::new(0);
        assert!(session.push_photo(test_photo(stage(1))).is_err());
    }

    #[test]
    fn test_record_in_order_completes() {
        let mut session = ready_session();
        session.record(0, ok_result(1)).unwrap();
        assert_eq!(session.state(), SessionState::Analyzing(stage(2)));
        session.record(0, ok_result(2)).unwrap();
        session.record(0, ok_result(3)).unwrap();
        assert_eq!(session.state(), SessionState::Complete);
        assert_eq!(session.results().len(), 3);
        assert_eq!(session.next_stage(), None);
    }

    #[test]
    fn test_record_out_of_order() {
        let mut session = ready_session();
        let err = session.record(0, ok_result(2)).unwrap_err();
        assert_eq!(err, StageOrderError::OutOfOrder { expected: 1, actual: 2 });
        assert!(session.results().is_empty());
    }

    #[test]
    fn test_record_never_exceeds_three() {
        let mut session = ready_session();
        for n in 1..=3 {
            session.record(0, ok_result(n)).unwrap();
        }
        assert_eq!(session.record(0, ok_result(3)), Err(StageOrderError::Full));
        assert_eq!(session.results().len(), 3);
    }

    #[test]
    fn test_record_rejects_stale_generation() {
        let mut session = AnalysisSession::new(4);
        let err = session.record(3, ok_result(1)).unwrap_err();
        assert_eq!(
            err,
            StageOrderError::Stale {
                result_generation: 3,
                session_generation: 4
            }
        );
    }

    #[test]
    fn test_record_rejected_outside_analyzing() {
        let mut idle = AnalysisSession::new(0);
        assert_eq!(
            idle.record(0, ok_result(1)),
            Err(StageOrderError::NotAnalyzing { state: SessionState::Idle })
        );
        assert_eq!(idle.state(), SessionState::Idle);
        assert!(idle.results().is_empty());

        let mut capturing = AnalysisSession::new(0);
        capturing.begin_capture().unwrap();
        capturing.push_photo(test_photo(stage(1))).unwrap();
        assert_eq!(
            capturing.record(0, ok_result(1)),
            Err(StageOrderError::NotAnalyzing {
                state: SessionState::CapturingPhoto(stage(2))
            })
        );
        assert_eq!(capturing.state(), SessionState::CapturingPhoto(stage(2)));
        assert!(capturing.results().is_empty());
    }

    #[test]
    fn test_terminal_session_stays_terminal() {
        let mut failed = ready_session();
        failed.fail();
        assert_eq!(
            failed.record(0, ok_result(1)),
            Err(StageOrderError::NotAnalyzing { state: SessionState::Failed })
        );
        assert_eq!(failed.state(), SessionState::Failed);
        assert!(failed.results().is_empty());

        let mut partial = ready_session();
        partial.record(0, ok_result(1)).unwrap();
        partial.fail();
        assert!(partial.record(0, ok_result(2)).is_err());
        assert_eq!(partial.state(), SessionState::Failed);
        assert_eq!(partial.results().len(), 1);

        let mut complete = ready_session();
        for n in 1..=3 {
            complete.record(0, ok_result(n)).unwrap();
        }
        assert!(complete.record(0, ok_result(1)).is_err());
        assert_eq!(complete.state(), SessionState::Complete);
        assert_eq!(complete.results().len(), 3);
    }

    #[test]
    fn test_stale_reported_before_state() {
        let mut session = AnalysisSession::new(1);
        assert!(matches!(
            session.record(0, ok_result(1)),
            Err(StageOrderError::Stale { .. })
        ));
    }

    #[test]
    fn test_failed_stages_count() {
        let mut session = ready_session();
        session.record(0, ok_result(1)).unwrap();
        session
            .record(
                0,
                StageResult::failed(
                    stage(2),
                    "prompt",
                    StageFailure::TimedOut("late".to_string()),
                    Duration::from_secs(30),
                ),
            )
            .unwrap();
        assert_eq!(session.failed_stages(), 1);
    }

    #[test]
    fn test_serialization_skips_photos() {
        let session = ready_session();
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("photos").is_none());
        assert_eq!(json["state"]["state"], "analyzing");
        assert_eq!(json["state"]["stage"], 1);
    }
}
