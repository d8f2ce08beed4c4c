//! Response classification.
//!
//! Maps a stage's raw model text to an analysis category and a confidence
//! label by case-insensitive substring matching against the ordered tables
//! in [`tables`]. Classification is total: text that matches nothing gets
//! [`AnalysisCategory::General`] and [`ConfidenceLevel::Medium`].
//!
//! The keyword heuristics were tuned on industrial photos and may misfire on
//! other subjects. Treat the output as a hint, not a verdict.

mod context;
mod questions;
pub mod tables;

pub use context::{derive_context, ContextCarry};
pub use questions::{follow_up_question, FollowUpQuestion};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::contains_any;
use tables::{CATEGORY_TABLE, CONFIDENCE_TABLE};

/// Simulation analysis family suggested by the model's description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisCategory {
    /// Welded joints.
    CrackPropagation,
    /// Bolted or screwed joints.
    FatigueAnalysis,
    /// Corroded parts.
    RemainingLife,
    /// Pipes and flanges.
    FluidDynamics,
    /// Nothing more specific matched.
    General,
}

impl AnalysisCategory {
    /// Every category, in table order with the default last.
    pub const ALL: [Self; 5] = [
        Self::CrackPropagation,
        Self::FatigueAnalysis,
        Self::RemainingLife,
        Self::FluidDynamics,
        Self::General,
    ];

    /// The report label for this category.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CrackPropagation => "Crack Propagation, Residual Stress Analysis",
            Self::FatigueAnalysis => "Fatigue Analysis, Stress Concentration",
            Self::RemainingLife => "Remaining Life Assessment, Material Degradation Study",
            Self::FluidDynamics => "Fluid Dynamics, Pressure Drop Analysis",
            Self::General => "General Structural Analysis",
        }
    }
}

impl Default for AnalysisCategory {
    fn default() -> Self {
        Self::General
    }
}

impl fmt::Display for AnalysisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How sure the model sounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    /// Assertive wording.
    High,
    /// Hedged wording, or nothing telling.
    Medium,
    /// The model said it could not tell.
    Low,
}

impl Default for ConfidenceLevel {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// A category and confidence pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Classification {
    /// Suggested analysis family.
    pub category: AnalysisCategory,
    /// Confidence label.
    pub confidence: ConfidenceLevel,
}

impl Classification {
    /// Creates a classification.
    #[must_use]
    pub const fn new(category: AnalysisCategory, confidence: ConfidenceLevel) -> Self {
        Self {
            category,
            confidence,
        }
    }

    /// True when a clarifying question should be asked before trusting
    /// this classification: low confidence or no specific category.
    #[must_use]
    pub fn needs_clarification(&self) -> bool {
        self.confidence == ConfidenceLevel::Low || self.category == AnalysisCategory::General
    }

    /// The canned follow-up question for the category, if any.
    #[must_use]
    pub fn follow_up(&self) -> Option<FollowUpQuestion> {
        follow_up_question(self.category)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.category, self.confidence)
    }
}

/// Classifies model text. Deterministic and total.
#[must_use]
pub fn classify(text: &str) -> Classification {
    let lower = text.to_lowercase();
    Classification {
        category: classify_category(&lower),
        confidence: classify_confidence(&lower),
    }
}

fn classify_category(lower: &str) -> AnalysisCategory {
    CATEGORY_TABLE
        .iter()
        .find(|(keywords, _)| contains_any(lower, keywords))
        .map_or(AnalysisCategory::General, |(_, category)| *category)
}

fn classify_confidence(lower: &str) -> ConfidenceLevel {
    CONFIDENCE_TABLE
        .iter()
        .find(|(keywords, _)| contains_any(lower, keywords))
        .map_or(ConfidenceLevel::Medium, |(_, level)| *level)
}
