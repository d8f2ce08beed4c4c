//! Core domain model types for simspec.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage indices and session state
//! - Session lifecycle events

mod event;
mod status;

pub use event::SessionEvent;
pub use status::{SessionState, StageIndex, STAGE_COUNT};
