//! Assertions over sessions and reports.

use crate::core::StageIndex;
use crate::session::AnalysisSession;

/// Asserts that `stage` has a succeeded result.
pub fn assert_stage_succeeded(session: &AnalysisSession, stage: StageIndex) {
    let result = session
        .result(stage)
        .unwrap_or_else(|| panic!("Expected a result for stage {stage}, found none"));
    assert!(
        result.is_success(),
        "Expected stage {stage} to succeed, got: {}",
        result.raw_text
    );
}

/// Asserts that `stage` failed and its failure label is `label`.
pub fn assert_stage_failed(session: &AnalysisSession, stage: StageIndex, label: &str) {
    let result = session
        .result(stage)
        .unwrap_or_else(|| panic!("Expected a result for stage {stage}, found none"));
    let failure = result
        .failure()
        .unwrap_or_else(|| panic!("Expected stage {stage} to fail, got: {}", result.raw_text));
    assert_eq!(
        failure.label(),
        label,
        "Unexpected failure kind for stage {stage}: {failure}"
    );
}

/// Asserts that the report section for `stage` is marked incomplete.
pub fn assert_section_incomplete(report: &str, stage: StageIndex) {
    let section = section(report, stage);
    assert!(
        section.contains("INCOMPLETE"),
        "Expected section {stage} to be incomplete:\n{section}"
    );
}

/// Asserts that the report section for `stage` contains `text`.
pub fn assert_section_contains(report: &str, stage: StageIndex, text: &str) {
    let section = section(report, stage);
    assert!(
        section.contains(text),
        "Expected section {stage} to contain {text:?}:\n{section}"
    );
}

fn section(report: &str, stage: StageIndex) -> &str {
    let heading = format!("STAGE {stage}:");
    let start = report
        .find(&heading)
        .unwrap_or_else(|| panic!("Report has no section for stage {stage}"));
    let rest = &report[start + heading.len()..];
    let end = rest
        .find("STAGE ")
        .or_else(|| rest.find("SIMULATION CHECKLIST"))
        .unwrap_or(rest.len());
    &rest[..end]
}
