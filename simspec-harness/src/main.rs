//! SimSpec desktop harness.
//!
//! Runs the three-stage analysis over image files instead of camera
//! captures, against the scripted stand-in model, and prints the report.
//!
//! ```text
//! simspec-harness --frames-dir test_frames --output report.txt --results results.json
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use simspec::prelude::*;
use simspec::testing::MockVisionRuntime;

const FRAME_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Run the SimSpec pipeline over three image files
#[derive(Parser, Debug)]
#[command(name = "simspec-harness")]
#[command(about = "Progressive analysis test harness", long_about = None)]
#[command(version)]
struct Args {
    /// Directory holding the frames; the first three in name order are used
    #[arg(long, default_value = "test_frames")]
    frames_dir: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write the session and metrics as JSON here
    #[arg(long)]
    results: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = match &args.config {
        Some(path) => SimspecConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimspecConfig::default(),
    };
    config.validate()?;

    let photos = load_photos(&args.frames_dir)?;

    let runtime = MockVisionRuntime::new();
    let gateway = Arc::new(InferenceGateway::new(Arc::new(runtime), config.gateway()));
    gateway.initialize().await?;
    if let Some(load_time) = gateway.model_load_time() {
        info!(load_s = load_time.as_secs_f64(), "Model initialized");
    }

    let orchestrator = StageOrchestrator::new(Arc::clone(&gateway), config.orchestrator())
        .with_event_sink(Arc::new(LoggingEventSink::default()));
    let session = orchestrator.analyze(photos).await?;
    let report_text = report::assemble(&session);

    match &args.output {
        Some(path) => {
            fs::write(path, &report_text)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => print!("{report_text}"),
    }

    let metrics = SessionMetrics::from_session(&session);
    if let Some(path) = &args.results {
        let dump = serde_json::json!({
            "model_load_ms": gateway.model_load_time().map(|d| d.as_millis() as u64),
            "session": session,
            "metrics": metrics,
        });
        fs::write(path, serde_json::to_string_pretty(&dump)?)
            .with_context(|| format!("writing results to {}", path.display()))?;
        info!(path = %path.display(), "Results written");
    }

    info!(
        session_id = %session.id(),
        succeeded = metrics.stages_succeeded,
        failed = metrics.stages_failed,
        questions = metrics.questions_generated,
        "Run finished"
    );
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_photos(dir: &Path) -> Result<Vec<Photo>> {
    let mut frames: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading frames directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    frames.sort();

    if frames.len() < STAGE_COUNT {
        bail!(
            "found {} frames in {}, need {STAGE_COUNT}",
            frames.len(),
            dir.display()
        );
    }

    frames
        .iter()
        .zip(StageIndex::all())
        .map(|(path, index)| {
            let image = image::open(path)
                .with_context(|| format!("decoding frame {}", path.display()))?;
            info!(frame = %path.display(), photo = index.get(), "Frame loaded");
            Ok(Photo::from_image(index, &image))
        })
        .collect()
}
