//! Report assembly.
//!
//! [`assemble`] renders a session into the fixed-section text report.
//! It is a pure function of the session: the report id and timestamp come
//! from the session itself, so the same session always renders the same
//! text. Every stage gets a section, whether it succeeded, failed or never
//! ran.

mod checklist;
mod metrics;

pub use checklist::{evaluate, total_occurrences, ChecklistEntry, ChecklistItem, Complexity, CHECKLIST};
pub use metrics::{CategoryCount, SessionMetrics, TimingSummary};

use std::fmt::Write as _;

use crate::core::StageIndex;
use crate::prompts::stage_prompt;
use crate::session::{AnalysisSession, StageResult};

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// The report identifier for a session, `SIM-` plus eight hex digits.
#[must_use]
pub fn report_id(session: &AnalysisSession) -> String {
    let hex = session.id().simple().to_string().to_uppercase();
    format!("SIM-{}", &hex[hex.len() - 8..])
}

/// Renders the full report for `session`.
#[must_use]
pub fn assemble(session: &AnalysisSession) -> String {
    let mut out = String::with_capacity(4096);
    render_header(&mut out, session);
    for stage in StageIndex::all() {
        render_stage(&mut out, stage, session.result(stage));
    }
    render_checklist(&mut out, session);
    render_metrics(&mut out, &SessionMetrics::from_session(session));
    out
}

fn render_header(out: &mut String, session: &AnalysisSession) {
    let succeeded = session.results().iter().filter(|r| r.is_success()).count();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "SIMULATION SCOPING REPORT");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Report ID: {}", report_id(session));
    let _ = writeln!(
        out,
        "Generated: {}",
        session.created_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "Session status: {}", session.state());
    let _ = writeln!(out, "Stages succeeded: {succeeded} of {}", StageIndex::all().len());
    out.push('\n');
}

fn render_stage(out: &mut String, stage: StageIndex, result: Option<&StageResult>) {
    let _ = writeln!(out, "STAGE {stage}: {}", stage_prompt(stage).title.to_uppercase());
    let _ = writeln!(out, "{THIN_RULE}");

    match result {
        Some(result) => match result.failure() {
            None => {
                let classification = result.classification;
                let _ = writeln!(out, "Analysis type: {}", classification.category);
                let _ = writeln!(out, "Confidence: {}", classification.confidence);
                let _ = writeln!(out, "Inference time: {} ms", result.elapsed_ms);
                out.push('\n');
                let _ = writeln!(out, "{}", result.raw_text.trim());
                if let Some(question) = classification.follow_up() {
                    out.push('\n');
                    let _ = writeln!(out, "Follow-up: {}", question.question);
                    for option in question.options {
                        let _ = writeln!(out, "  - {option}");
                    }
                }
            }
            Some(failure) => {
                let _ = writeln!(out, "INCOMPLETE ({})", failure.label());
                let _ = writeln!(out, "Detail: {}", failure.detail());
                let _ = writeln!(out, "Elapsed: {} ms", result.elapsed_ms);
            }
        },
        None => {
            let _ = writeln!(out, "INCOMPLETE (not analyzed)");
        }
    }
    out.push('\n');
}

fn render_checklist(out: &mut String, session: &AnalysisSession) {
    let texts = session
        .results()
        .iter()
        .filter(|r| r.is_success())
        .map(|r| r.raw_text.as_str());
    let entries = evaluate(texts);
    let total = total_occurrences(&entries);

    let _ = writeln!(out, "SIMULATION CHECKLIST");
    let _ = writeln!(out, "{THIN_RULE}");
    for entry in &entries {
        let mark = if entry.is_ticked() { 'x' } else { ' ' };
        let _ = writeln!(out, "[{mark}] {} ({})", entry.label, entry.occurrences);
    }
    out.push('\n');
    let _ = writeln!(
        out,
        "Estimated complexity: {} ({total} keyword matches)",
        Complexity::from_occurrences(total)
    );
    out.push('\n');
}

fn render_metrics(out: &mut String, metrics: &SessionMetrics) {
    let _ = writeln!(out, "RUN METRICS");
    let _ = writeln!(out, "{THIN_RULE}");
    let _ = writeln!(
        out,
        "Stages: {} succeeded, {} failed, {} not run",
        metrics.stages_succeeded, metrics.stages_failed, metrics.stages_pending
    );
    match &metrics.inference {
        Some(t) => {
            let _ = writeln!(
                out,
                "Inference time: mean {:.0} ms, median {:.0} ms, min {} ms, max {} ms",
                t.mean_ms, t.median_ms, t.min_ms, t.max_ms
            );
        }
        None => {
            let _ = writeln!(out, "Inference time: n/a");
        }
    }
    for entry in &metrics.category_distribution {
        let _ = writeln!(
            out,
            "{}: {} ({:.1}%)",
            entry.category,
            entry.count,
            metrics.category_share(entry.category)
        );
    }
    let _ = writeln!(
        out,
        "Follow-up questions: {}/{}",
        metrics.questions_generated, metrics.stages_succeeded
    );
    let _ = writeln!(out, "{RULE}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageFailure;
    use crate::testing::test_photos;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn stage(n: u8) -> StageIndex {
        StageIndex::new(n).unwrap()
    }

    fn captured_session() -> AnalysisSession {
        let mut session = AnalysisSession::new(0);
        session.begin_capture().unwrap();
        for photo in test_photos() {
            session.push_photo(photo).unwrap();
        }
        session
    }

    fn timed_out(n: u8) -> StageResult {
        StageResult::failed(
            stage(n),
            "p",
            StageFailure::TimedOut("Inference timed out after 30s".to_string()),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_succeeded_stage_section() {
        let result = StageResult::succeeded(
            stage(2),
            "p",
            "This is a welded steel bracket with four bolted mounting holes",
            Duration::from_millis(840),
        );
        let mut out = String::new();
        render_stage(&mut out, stage(2), Some(&result));

        let expected = "\
STAGE 2: CONNECTION ANALYSIS
------------------------------------------------------------
Analysis type: Crack Propagation, Residual Stress Analysis
Confidence: MEDIUM
Inference time: 840 ms

This is a welded steel bracket with four bolted mounting holes

Follow-up: What welding process was likely used?
  - MIG/GMAW
  - TIG/GTAW
  - Stick/SMAW
  - Unknown

";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_failed_stage_section() {
        let mut out = String::new();
        render_stage(&mut out, stage(2), Some(&timed_out(2)));
        let expected = "\
STAGE 2: CONNECTION ANALYSIS
------------------------------------------------------------
INCOMPLETE (timed out)
Detail: Inference timed out after 30s
Elapsed: 30000 ms

";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_three_sections_with_one_failed() {
        let mut session = captured_session();
        session
            .record(0, StageResult::succeeded(stage(1), "p", "A steel pipe flange", Duration::from_millis(100)))
            .unwrap();
        session.record(0, timed_out(2)).unwrap();
        session
            .record(0, StageResult::succeeded(stage(3), "p", "Light rust on the bolts", Duration::from_millis(90)))
            .unwrap();

        let report = assemble(&session);
        assert!(report.contains("STAGE 1: SYSTEM OVERVIEW"));
        assert!(report.contains("STAGE 2: CONNECTION ANALYSIS"));
        assert!(report.contains("STAGE 3: SURFACE CONDITION"));
        assert_eq!(report.matches("INCOMPLETE").count(), 1);
        assert!(report.contains("Session status: complete"));
        assert!(report.contains("Stages succeeded: 2 of 3"));
        assert!(report.contains("A steel pipe flange"));
        assert!(report.contains("Light rust on the bolts"));
    }

    #[test]
    fn test_unrun_session_marks_every_stage() {
        let report = assemble(&captured_session());
        assert_eq!(report.matches("INCOMPLETE (not analyzed)").count(), 3);
        assert!(report.contains("Estimated complexity: LOW (0 keyword matches)"));
        assert!(report.contains("Inference time: n/a"));
    }

    #[test]
    fn test_checklist_ignores_failure_markers() {
        let mut session = captured_session();
        session.record(0, timed_out(1)).unwrap();
        let report = assemble(&session);
        assert!(report.contains("[ ] Load cases and boundary conditions (0)"));
    }

    #[test]
    fn test_checklist_and_complexity() {
        let mut session = captured_session();
        session
            .record(
                0,
                StageResult::succeeded(
                    stage(1),
                    "p",
                    "A steel flange with eight bolts under pressure load, showing corrosion",
                    Duration::from_millis(100),
                ),
            )
            .unwrap();
        let report = assemble(&session);
        assert!(report.contains("[x] Geometry capture (CAD model or field measurements) (1)"));
        assert!(report.contains("[x] Material properties (1)"));
        assert!(report.contains("[x] Joint and connection modelling (1)"));
        assert!(report.contains("[x] Load cases and boundary conditions (2)"));
        assert!(report.contains("[x] Degradation inputs (corrosion, wear, cracking) (1)"));
        assert!(report.contains("Estimated complexity: MEDIUM (6 keyword matches)"));
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let session = captured_session();
        assert_eq!(assemble(&session), assemble(&session));
    }

    #[test]
    fn test_report_id_format() {
        let id = report_id(&captured_session());
        assert_eq!(id.len(), 12);
        assert!(id.starts_with("SIM-"));
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
