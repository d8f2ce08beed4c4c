//! Canned follow-up questions per analysis category.

use serde::Serialize;

use super::AnalysisCategory;

/// A multiple-choice question to refine the simulation setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowUpQuestion {
    /// The question text.
    pub question: &'static str,
    /// Answer options, in display order.
    pub options: &'static [&'static str],
}

/// Returns the follow-up question for `category`. The general category has none.
#[must_use]
pub fn follow_up_question(category: AnalysisCategory) -> Option<FollowUpQuestion> {
    let (question, options): (&'static str, &'static [&'static str]) = match category {
        AnalysisCategory::FatigueAnalysis => (
            "What is the primary loading condition for these fasteners?",
            &["Static Tension", "Cyclic (Vibration)", "Shear", "Unknown"],
        ),
        AnalysisCategory::CrackPropagation => (
            "What welding process was likely used?",
            &["MIG/GMAW", "TIG/GTAW", "Stick/SMAW", "Unknown"],
        ),
        AnalysisCategory::RemainingLife => (
            "What is the operational environment?",
            &["Dry, Indoor", "Humid, Outdoor", "Marine/Salt-Spray", "Chemical Exposure"],
        ),
        AnalysisCategory::FluidDynamics => (
            "What is the typical operating pressure?",
            &["Low (< 50 psi)", "Medium (50-500 psi)", "High (> 500 psi)", "Unknown"],
        ),
        AnalysisCategory::General => return None,
    };
    Some(FollowUpQuestion { question, options })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_specific_category_has_a_question() {
        for category in [
            AnalysisCategory::CrackPropagation,
            AnalysisCategory::FatigueAnalysis,
            AnalysisCategory::RemainingLife,
            AnalysisCategory::FluidDynamics,
        ] {
            let q = follow_up_question(category).unwrap();
            assert!(q.question.ends_with('?'));
            assert_eq!(q.options.len(), 4);
        }
    }

    #[test]
    fn test_general_has_no_question() {
        assert!(follow_up_question(AnalysisCategory::General).is_none());
    }

    #[test]
    fn test_weld_question() {
        let q = follow_up_question(AnalysisCategory::CrackPropagation).unwrap();
        assert_eq!(q.question, "What welding process was likely used?");
        assert_eq!(q.options[1], "TIG/GTAW");
    }
}
