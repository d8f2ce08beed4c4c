//! Stage indices and session state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of analysis stages (and photos) in every session.
pub const STAGE_COUNT: usize = 3;

/// A validated stage number in `1..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StageIndex(u8);

impl StageIndex {
    /// The first stage.
    pub const FIRST: Self = Self(1);
    /// The last stage.
    pub const LAST: Self = Self(3);

    /// Creates a stage index, returning `None` outside `1..=3`.
    #[must_use]
    pub const fn new(n: u8) -> Option<Self> {
        if n >= 1 && n as usize <= STAGE_COUNT {
            Some(Self(n))
        } else {
            None
        }
    }

    /// Returns the 1-based stage number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the 0-based position, for indexing stage tables.
    #[must_use]
    pub const fn position(self) -> usize {
        self.0 as usize - 1
    }

    /// Returns the following stage, or `None` after the last one.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    /// Returns true for the final stage.
    #[must_use]
    pub const fn is_last(self) -> bool {
        self.0 as usize == STAGE_COUNT
    }

    /// All stage indices in execution order.
    #[must_use]
    pub const fn all() -> [Self; STAGE_COUNT] {
        [Self(1), Self(2), Self(3)]
    }
}

impl TryFrom<u8> for StageIndex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("stage index must be in 1..={STAGE_COUNT}, got {value}"))
    }
}

impl From<StageIndex> for u8 {
    fn from(index: StageIndex) -> Self {
        index.0
    }
}

impl fmt::Display for StageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an analysis session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum SessionState {
    /// No session in progress.
    Idle,
    /// Waiting for the photo with the given capture index.
    CapturingPhoto(StageIndex),
    /// Running (or about to run) the given analysis stage.
    Analyzing(StageIndex),
    /// All stages have a recorded result.
    Complete,
    /// The session could not run at all.
    Failed,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::CapturingPhoto(n) => write!(f, "capturing photo {n}"),
            Self::Analyzing(n) => write!(f, "analyzing stage {n}"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl SessionState {
    /// Returns true if only a reset can leave this state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Returns true while photos are being collected.
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::CapturingPhoto(_))
    }

    /// Returns true while stages are being analyzed.
    #[must_use]
    pub fn is_analyzing(&self) -> bool {
        matches!(self, Self::Analyzing(_))
    }
}
