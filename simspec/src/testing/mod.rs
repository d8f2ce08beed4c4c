//! Testing utilities.
//!
//! This module provides:
//! - [`MockVisionRuntime`], a scripted stand-in for the model runtime
//! - Photo fixtures and a mock-backed orchestrator rig
//! - Assertions over sessions and reports

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_section_contains, assert_section_incomplete, assert_stage_failed,
    assert_stage_succeeded,
};
pub use fixtures::{test_photo, test_photos, TestRig};
pub use mocks::{MockVisionRuntime, ScriptedReply};
