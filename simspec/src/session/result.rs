//! Per-stage result records.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::classify::{classify, AnalysisCategory, Classification, ConfidenceLevel};
use crate::core::StageIndex;
use crate::errors::StageFailure;

/// Whether a stage produced model text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "failure", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The model answered.
    Succeeded,
    /// The stage failed; its raw text is a placeholder.
    Failed(StageFailure),
}

/// The recorded outcome of one stage. Created once, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    /// Which stage this is.
    pub stage: StageIndex,
    /// The full prompt sent, context carry included.
    pub prompt: String,
    /// Model text, or a failure marker.
    pub raw_text: String,
    /// Wall time spent on the stage in milliseconds.
    pub elapsed_ms: u64,
    /// Category and confidence of `raw_text`.
    pub classification: Classification,
    /// Success or failure.
    pub outcome: StageOutcome,
}

impl StageResult {
    /// Creates a succeeded result and classifies its text.
    #[must_use]
    pub fn succeeded(
        stage: StageIndex,
        prompt: impl Into<String>,
        raw_text: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        let raw_text = raw_text.into();
        Self {
            stage,
            prompt: prompt.into(),
            classification: classify(&raw_text),
            raw_text,
            elapsed_ms: duration_ms(elapsed),
            outcome: StageOutcome::Succeeded,
        }
    }

    /// Creates a failed result whose raw text names the failure.
    ///
    /// Failed stages classify as general with low confidence so they never
    /// feed the context carry.
    #[must_use]
    pub fn failed(
        stage: StageIndex,
        prompt: impl Into<String>,
        failure: StageFailure,
        elapsed: Duration,
    ) -> Self {
        Self {
            stage,
            prompt: prompt.into(),
            raw_text: format!("[Stage {stage} incomplete: {failure}]"),
            elapsed_ms: duration_ms(elapsed),
            classification: Classification::new(AnalysisCategory::General, ConfidenceLevel::Low),
            outcome: StageOutcome::Failed(failure),
        }
    }

    /// Returns true if the model answered.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, StageOutcome::Succeeded)
    }

    /// The failure, if the stage failed.
    #[must_use]
    pub fn failure(&self) -> Option<&StageFailure> {
        match &self.outcome {
            StageOutcome::Succeeded => None,
            StageOutcome::Failed(failure) => Some(failure),
        }
    }

    /// Elapsed time as a duration.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(n: u8) -> StageIndex {
        StageIndex::new(n).unwrap()
    }

    #[test]
    fn test_succeeded_classifies_text() {
        let result = StageResult::succeeded(
            stage(2),
            "prompt",
            "This is a welded steel bracket with four bolted mounting holes",
            Duration::from_millis(1250),
        );
        assert!(result.is_success());
        assert_eq!(result.classification.category, AnalysisCategory::CrackPropagation);
        assert_eq!(result.elapsed_ms, 1250);
        assert!(result.failure().is_none());
    }

    #[test]
    fn test_failed_marks_raw_text() {
        let failure = StageFailure::TimedOut("Inference timed out after 30s".to_string());
        let result = StageResult::failed(stage(2), "prompt", failure.clone(), Duration::from_secs(30));
        assert!(!result.is_success());
        assert_eq!(result.failure(), Some(&failure));
        assert_eq!(
            result.raw_text,
            "[Stage 2 incomplete: timed out: Inference timed out after 30s]"
        );
        assert_eq!(result.classification.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn test_serializes_outcome() {
        let result = StageResult::succeeded(stage(1), "p", "a gear", Duration::ZERO);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"]["status"], "succeeded");
        assert_eq!(json["stage"], 1);

        let failed = StageResult::failed(
            stage(3),
            "p",
            StageFailure::Preprocess("bad".to_string()),
            Duration::ZERO,
        );
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["outcome"]["failure"]["kind"], "preprocess");
    }
}
