//! Benchmarks for classification and report assembly.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

use simspec::classify::classify;
use simspec::core::StageIndex;
use simspec::report;
use simspec::session::{AnalysisSession, StageResult};
use simspec::testing::test_photos;

const STAGE_TEXTS: [&str; 3] = [
    "This image shows a large industrial pipe flange assembly with multiple bolt connections. \
     The system appears to be part of a pressure vessel or piping network with metallic components.",
    "The connection points consist of high-strength bolts with hex nuts, likely Grade 8 or similar. \
     The bolts appear to be in tension loading configuration with visible thread engagement.",
    "Surface shows signs of light corrosion and weathering typical of outdoor industrial environments. \
     Some bolt heads show minor rust staining but no significant structural deterioration is visible.",
];

fn completed_session() -> AnalysisSession {
    let mut session = AnalysisSession::new(0);
    let _ = session.begin_capture();
    for photo in test_photos() {
        let _ = session.push_photo(photo);
    }
    for (stage, text) in StageIndex::all().into_iter().zip(STAGE_TEXTS) {
        let result = StageResult::succeeded(stage, "prompt", text, Duration::from_millis(850));
        let _ = session.record(0, result);
    }
    session
}

fn classify_benchmark(c: &mut Criterion) {
    c.bench_function("classify_stage_text", |b| {
        b.iter(|| {
            for text in STAGE_TEXTS {
                black_box(classify(black_box(text)));
            }
        });
    });
}

fn report_benchmark(c: &mut Criterion) {
    let session = completed_session();
    c.bench_function("assemble_report", |b| {
        b.iter(|| black_box(report::assemble(black_box(&session))));
    });
}

criterion_group!(benches, classify_benchmark, report_benchmark);
criterion_main!(benches);
