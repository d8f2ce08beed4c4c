//! Simulation checklist and complexity estimate.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;

/// A checklist entry and the keywords that tick it.
#[derive(Debug, Clone, Copy)]
pub struct ChecklistItem {
    /// Text shown in the report.
    pub label: &'static str,
    /// Lowercase word prefixes counted in stage text.
    pub keywords: &'static [&'static str],
}

/// Checklist items in report order.
pub const CHECKLIST: &[ChecklistItem] = &[
    ChecklistItem {
        label: "Geometry capture (CAD model or field measurements)",
        keywords: &[
            "flange", "bracket", "pipe", "shaft", "plate", "beam", "housing", "gear", "bearing",
            "valve",
        ],
    },
    ChecklistItem {
        label: "Material properties",
        keywords: &["steel", "aluminium", "aluminum", "iron", "metal", "alloy", "cast"],
    },
    ChecklistItem {
        label: "Joint and connection modelling",
        keywords: &["bolt", "weld", "fastener", "screw", "clamp", "nut", "rivet"],
    },
    ChecklistItem {
        label: "Load cases and boundary conditions",
        keywords: &["load", "tension", "pressure", "stress", "vibration", "torque"],
    },
    ChecklistItem {
        label: "Degradation inputs (corrosion, wear, cracking)",
        keywords: &["corrosion", "corroded", "rust", "wear", "damage", "crack", "weather"],
    },
];

static PATTERNS: LazyLock<Vec<Option<Regex>>> =
    LazyLock::new(|| CHECKLIST.iter().map(|item| keyword_pattern(item.keywords)).collect());

fn keyword_pattern(keywords: &[&str]) -> Option<Regex> {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!(r"\b(?:{alternation})"))
        .case_insensitive(true)
        .build()
        .map_err(|err| warn!(error = %err, "Invalid checklist pattern"))
        .ok()
}

/// One checklist line with its keyword count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    /// Item label.
    pub label: String,
    /// Keyword occurrences across the counted texts.
    pub occurrences: usize,
}

impl ChecklistEntry {
    /// Returns true if any keyword occurred.
    #[must_use]
    pub fn is_ticked(&self) -> bool {
        self.occurrences > 0
    }
}

/// Estimated simulation setup effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Complexity {
    /// Up to 3 keyword occurrences.
    Low,
    /// Up to 8 keyword occurrences.
    Medium,
    /// More than 8.
    High,
}

impl Complexity {
    /// Maps a total keyword count to a complexity level.
    #[must_use]
    pub const fn from_occurrences(total: usize) -> Self {
        match total {
            0..=3 => Self::Low,
            4..=8 => Self::Medium,
            _ => Self::High,
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Counts checklist keywords across `texts`, in checklist order.
#[must_use]
pub fn evaluate<'a, I>(texts: I) -> Vec<ChecklistEntry>
where
    I: IntoIterator<Item = &'a str>,
{
    let texts: Vec<&str> = texts.into_iter().collect();
    CHECKLIST
        .iter()
        .zip(PATTERNS.iter())
        .map(|(item, pattern)| ChecklistEntry {
            label: item.label.to_string(),
            occurrences: pattern.as_ref().map_or(0, |re| {
                texts.iter().map(|t| re.find_iter(t).count()).sum()
            }),
        })
        .collect()
}

/// Total keyword occurrences over a checklist.
#[must_use]
pub fn total_occurrences(entries: &[ChecklistEntry]) -> usize {
    entries.iter().map(|e| e.occurrences).sum()
}
