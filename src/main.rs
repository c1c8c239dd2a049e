// src/main.rs
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use finger_rom::config::McpReference;
use finger_rom::data::{default_output_dir, render_outcome, DataExporter};
use finger_rom::detector::CommandDetector;
use finger_rom::geometry::AngleConvention;
use finger_rom::source::{FrameSource, LandmarkDetector};
use finger_rom::topology::{Finger, FingerGroup};
use finger_rom::track::{LandmarkTrack, DEFAULT_MATCH_TOLERANCE};
use finger_rom::video::VideoFileSource;
use finger_rom::{AnalysisError, Analyzer, MeasurementMode, RunConfig, RunOutcome};

/// Finger joint range-of-motion from a hand video
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON run configuration; flags below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pre-detected landmark track (JSON)
    #[arg(long, value_name = "FILE", conflicts_with = "video")]
    track: Option<PathBuf>,

    /// Video file to sample with ffmpeg
    #[arg(long, value_name = "FILE", requires = "detector_cmd")]
    video: Option<PathBuf>,

    /// Detector command; receives a frame PNG path, prints 21 landmarks as JSON or null
    #[arg(long, value_name = "CMD")]
    detector_cmd: Option<String>,

    /// EXT_OK (extension achievable) or EXT_NG (arc only)
    #[arg(long)]
    mode: Option<MeasurementMode>,

    /// Examination group: thumb reads index+middle, pinky reads ring+pinky
    #[arg(long, value_enum)]
    group: Option<GroupArg>,

    /// Explicit finger; may be repeated. Overrides --group
    #[arg(long = "finger", value_name = "NAME")]
    fingers: Vec<Finger>,

    /// Seconds between samples
    #[arg(long, value_name = "SECONDS")]
    step: Option<f64>,

    /// Minimum detection yield (0.0 - 1.0)
    #[arg(long, value_name = "RATIO")]
    threshold: Option<f64>,

    #[arg(long, value_enum)]
    convention: Option<ConventionArg>,

    /// Proximal point for the MCP angle
    #[arg(long, value_enum)]
    mcp_reference: Option<McpReferenceArg>,

    /// Downscale video frames to this width before detection
    #[arg(long, value_name = "PIXELS")]
    scale_width: Option<u32>,

    /// Number of runs
    #[arg(long, default_value = "1")]
    repeat: usize,

    /// Milliseconds between repeated runs
    #[arg(long, default_value = "1000", value_name = "MS")]
    interval_ms: u64,

    /// Where session exports go (default: ~/Documents/FingerRom)
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Skip writing CSV/JSON/text exports
    #[arg(long)]
    no_export: bool,

    /// Log every sampled seek and missed frame (same as RUST_LOG=debug)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum GroupArg {
    Thumb,
    Pinky,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ConventionArg {
    Included,
    Flexion,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum McpReferenceArg {
    Wrist,
    PalmCenter,
}

impl Args {
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)?,
            None => RunConfig::default(),
        };

        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(group) = self.group {
            config.fingers = match group {
                GroupArg::Thumb => FingerGroup::Thumb,
                GroupArg::Pinky => FingerGroup::Pinky,
            }
            .fingers();
        }
        if !self.fingers.is_empty() {
            config.fingers = self.fingers.clone();
        }
        if let Some(step) = self.step {
            config.time_step = step;
        }
        if let Some(threshold) = self.threshold {
            config.visibility_threshold = threshold;
        }
        if let Some(convention) = self.convention {
            config.convention = match convention {
                ConventionArg::Included => AngleConvention::Included,
                ConventionArg::Flexion => AngleConvention::Flexion,
            };
        }
        if let Some(reference) = self.mcp_reference {
            config.mcp_reference = match reference {
                McpReferenceArg::Wrist => McpReference::Wrist,
                McpReferenceArg::PalmCenter => McpReference::PalmCenter,
            };
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // RUST_LOG wins; otherwise --verbose enables per-sample events
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = args.run_config()?;
    let analyzer = Analyzer::new(config)?;

    if let Some(path) = &args.track {
        let track = LandmarkTrack::from_json_file(path)?;
        let (mut source, mut detector) = track.into_replay(DEFAULT_MATCH_TOLERANCE);
        return analyze_and_report(&analyzer, &mut source, &mut detector, &args).await;
    }

    if let Some(path) = &args.video {
        let command = args
            .detector_cmd
            .as_deref()
            .ok_or_else(|| AnalysisError::NotReady("no detector command given".to_string()))?;
        let mut detector = CommandDetector::from_command_line(command)?;
        let mut source = VideoFileSource::open(path)
            .await
            .map_err(|e| AnalysisError::NotReady(format!("{e:#}")))?;
        if let Some(width) = args.scale_width {
            source = source.with_scale_width(width);
        }
        return analyze_and_report(&analyzer, &mut source, &mut detector, &args).await;
    }

    Err(AnalysisError::NotReady("no input selected (use --track or --video)".to_string()).into())
}

async fn analyze_and_report<S, D>(analyzer: &Analyzer, source: &mut S, detector: &mut D, args: &Args) -> Result<()>
where
    S: FrameSource,
    D: LandmarkDetector<S::Frame>,
{
    let outcomes = if args.repeat > 1 {
        analyzer
            .analyze_repeat(source, detector, args.repeat, Duration::from_millis(args.interval_ms))
            .await?
    } else {
        vec![analyzer.analyze(source, detector).await?]
    };

    let output_dir = args.export_dir.clone().unwrap_or_else(default_output_dir);
    let session = format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"));

    for (run, outcome) in outcomes.iter().enumerate() {
        let session_name = if outcomes.len() > 1 {
            println!("--- run {} ---", run + 1);
            format!("{}_run{:02}", session, run + 1)
        } else {
            session.clone()
        };
        print!("{}", render_outcome(outcome));

        if !args.no_export {
            export(&output_dir, session_name, outcome).context("Failed to export results")?;
        }
    }

    Ok(())
}

fn export(output_dir: &Path, session_name: String, outcome: &RunOutcome) -> Result<()> {
    let exporter = DataExporter::new(output_dir, Some(session_name));
    let json_path = exporter.export_json(outcome)?;
    let text_path = exporter.export_text(outcome)?;
    info!("Report written to {}", json_path.display());
    info!("Result written to {}", text_path.display());
    if let Some(report) = outcome.report() {
        let csv_path = exporter.export_csv(report)?;
        info!("Readings written to {}", csv_path.display());
    }
    Ok(())
}
