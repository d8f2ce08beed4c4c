//! Context carried from earlier stages into later prompts.

use serde::{Deserialize, Serialize};

use super::tables::SUBJECT_NOUNS;
use super::ConfidenceLevel;
use crate::core::StageIndex;
use crate::session::StageResult;

/// The subject inferred from earlier stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextCarry {
    /// The subject noun named in the next prompt.
    pub subject: String,
    /// The stage the subject came from, or `None` for the placeholder.
    pub derived_from: Option<StageIndex>,
}

impl ContextCarry {
    /// The sentence appended to the next stage's prompt.
    #[must_use]
    pub fn phrase(&self) -> String {
        format!(
            " Context: the subject was previously identified as a {}.",
            self.subject
        )
    }

    /// Returns true if no earlier stage yielded a subject.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.derived_from.is_none()
    }
}

/// Derives the carried subject from `prior` results.
///
/// Walks the results newest first, skipping failed stages and stages
/// classified with LOW confidence, and takes the first subject noun from
/// the ordered noun table found in the text. Falls back to `placeholder`,
/// so the next prompt is always well formed.
#[must_use]
pub fn derive_context(prior: &[StageResult], placeholder: &str) -> ContextCarry {
    prior
        .iter()
        .rev()
        .filter(|r| r.is_success() && r.classification.confidence != ConfidenceLevel::Low)
        .find_map(|r| {
            let lower = r.raw_text.to_lowercase();
            SUBJECT_NOUNS
                .iter()
                .find(|noun| lower.contains(*noun))
                .map(|noun| ContextCarry {
                    subject: (*noun).to_string(),
                    derived_from: Some(r.stage),
                })
        })
        .unwrap_or_else(|| ContextCarry {
            subject: placeholder.to_string(),
            derived_from: None,
        })
}
