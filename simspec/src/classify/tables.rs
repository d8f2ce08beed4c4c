//! Ordered keyword tables.
//!
//! Every table is a slice, never a map: the first matching row wins, so row
//! order decides ties and must stay stable for reproducible reports.
//! Keywords are lowercase; matching lowercases the text first.

use super::{AnalysisCategory, ConfidenceLevel};

/// Keyword sets mapped to analysis categories. Weld precedes fastener.
pub const CATEGORY_TABLE: &[(&[&str], AnalysisCategory)] = &[
    (&["weld"], AnalysisCategory::CrackPropagation),
    (&["fastener", "bolt", "screw"], AnalysisCategory::FatigueAnalysis),
    (&["corrosion", "rust"], AnalysisCategory::RemainingLife),
    (&["pipe", "flange"], AnalysisCategory::FluidDynamics),
];

/// Keyword sets mapped to confidence levels: hedging, uncertainty, assertive.
pub const CONFIDENCE_TABLE: &[(&[&str], ConfidenceLevel)] = &[
    (
        &["appears", "likely", "seems", "possibly", "probably", "suggests", "may be", "might"],
        ConfidenceLevel::Medium,
    ),
    (
        &["unable", "unclear", "uncertain", "cannot determine", "not sure", "difficult to", "unknown"],
        ConfidenceLevel::Low,
    ),
    (
        &["clearly", "definitely", "certainly", "obviously", "unmistakabl"],
        ConfidenceLevel::High,
    ),
];

/// Component nouns used as the carried subject, most specific first.
pub const SUBJECT_NOUNS: &[&str] = &[
    "flange", "bracket", "bearing", "gear", "shaft", "valve", "coupling", "spring", "housing",
    "beam", "plate", "pipe", "fastener", "bolt", "weld", "frame",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn all_lowercase(words: &[&str]) -> bool {
        words.iter().all(|w| w.chars().all(|c| !c.is_uppercase()))
    }

    #[test]
    fn test_keywords_are_lowercase() {
        assert!(CATEGORY_TABLE.iter().all(|(keys, _)| all_lowercase(keys)));
        assert!(CONFIDENCE_TABLE.iter().all(|(keys, _)| all_lowercase(keys)));
        assert!(all_lowercase(SUBJECT_NOUNS));
    }

    #[test]
    fn test_weld_row_precedes_fastener_row() {
        let weld = CATEGORY_TABLE
            .iter()
            .position(|(_, c)| *c == AnalysisCategory::CrackPropagation)
            .unwrap();
        let bolt = CATEGORY_TABLE
            .iter()
            .position(|(_, c)| *c == AnalysisCategory::FatigueAnalysis)
            .unwrap();
        assert!(weld < bolt);
    }

    #[test]
    fn test_general_category_is_not_in_table() {
        assert!(CATEGORY_TABLE
            .iter()
            .all(|(_, c)| *c != AnalysisCategory::General));
    }
}
