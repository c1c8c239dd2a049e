// src/analysis.rs - One analysis run from frame source to ROM report
use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{aggregate, FingerOutcome};
use crate::config::{MeasurementMode, RunConfig};
use crate::error::AnalysisError;
use crate::extractor::JointExtractor;
use crate::quality::{GateOutcome, QualityGate, LOW_VISIBILITY_MESSAGE};
use crate::sampler::{sample_count, FrameSampler};
use crate::series::{Reading, RunContext};
use crate::source::{FrameSource, LandmarkDetector};
use crate::topology::Finger;

pub const ANALYZER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub mode: MeasurementMode,
    pub sampled_frames: usize,
    pub detected_frames: usize,
    pub detection_yield: f64,
    pub fingers: BTreeMap<Finger, FingerOutcome>,
    /// Accepted per-frame readings, kept for export.
    pub readings: BTreeMap<Finger, Vec<Reading>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(RunReport),
    LowVisibility {
        started_at: DateTime<Local>,
        sampled_frames: usize,
        detected_frames: usize,
        detection_yield: f64,
        message: &'static str,
    },
}

impl RunOutcome {
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Completed(report) => Some(report),
            RunOutcome::LowVisibility { .. } => None,
        }
    }

    pub fn is_low_visibility(&self) -> bool {
        matches!(self, RunOutcome::LowVisibility { .. })
    }
}

pub struct Analyzer {
    config: RunConfig,
}

impl Analyzer {
    pub fn new(config: RunConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the full pipeline once.
    ///
    /// Degenerate frames and detector misses are absorbed. Only an unusable
    /// source ends the run with an error; too few detections end it with
    /// [`RunOutcome::LowVisibility`].
    pub async fn analyze<S, D>(&self, source: &mut S, detector: &mut D) -> Result<RunOutcome, AnalysisError>
    where
        S: FrameSource,
        D: LandmarkDetector<S::Frame>,
    {
        let started_at = Local::now();
        let config = &self.config;

        let duration = source.duration();
        if !duration.is_finite() || duration < 0.0 {
            warn!("source not ready (duration {})", duration);
            return Err(AnalysisError::NotReady(format!(
                "frame source reports an invalid duration ({duration})"
            )));
        }
        if sample_count(duration, config.time_step).is_none() {
            warn!("source not ready (duration {} too long for step {})", duration, config.time_step);
            return Err(AnalysisError::NotReady(format!(
                "duration {duration}s cannot be sampled every {}s",
                config.time_step
            )));
        }

        info!(
            "analysis start: mode={} fingers={:?} step={}s duration={:.2}s version={}",
            config.mode, config.fingers, config.time_step, duration, ANALYZER_VERSION
        );

        let extractor = JointExtractor::new(config.convention, config.mcp_reference);
        let mut ctx = RunContext::new(&config.fingers, extractor);

        FrameSampler::new(config.time_step)
            .for_each_sample(source, detector, |t, landmarks| ctx.observe(t, landmarks))
            .await;

        let gate = QualityGate::new(config.visibility_threshold);
        let detection_yield = match gate.check(ctx.detected(), ctx.sampled()) {
            GateOutcome::Pass { detection_yield } => {
                info!(
                    "quality gate passed: {}/{} frames detected ({:.1}%)",
                    ctx.detected(),
                    ctx.sampled(),
                    detection_yield * 100.0
                );
                detection_yield
            }
            GateOutcome::LowVisibility { detection_yield } => {
                warn!(
                    "quality gate failed: {}/{} frames detected ({:.1}% < {:.1}%): {}",
                    ctx.detected(),
                    ctx.sampled(),
                    detection_yield * 100.0,
                    gate.threshold() * 100.0,
                    LOW_VISIBILITY_MESSAGE
                );
                return Ok(RunOutcome::LowVisibility {
                    started_at,
                    sampled_frames: ctx.sampled(),
                    detected_frames: ctx.detected(),
                    detection_yield,
                    message: LOW_VISIBILITY_MESSAGE,
                });
            }
        };

        let sampled_frames = ctx.sampled();
        let detected_frames = ctx.detected();
        let mut fingers = BTreeMap::new();
        let mut readings = BTreeMap::new();

        for (finger, series) in ctx.into_series() {
            let outcome = aggregate(&series, config.mode, config.convention);
            match &outcome {
                FingerOutcome::Measured(rom) => {
                    if let Some(caveat) = rom.caveat {
                        warn!("{}: {}", finger, caveat.message());
                    }
                }
                FingerOutcome::NoValidFrames => warn!("{}: no valid frames", finger),
            }
            fingers.insert(finger, outcome);
            readings.insert(finger, series.readings().to_vec());
        }

        info!("analysis finished");

        Ok(RunOutcome::Completed(RunReport {
            started_at,
            mode: config.mode,
            sampled_frames,
            detected_frames,
            detection_yield,
            fingers,
            readings,
        }))
    }

    /// Run [`Analyzer::analyze`] `times` times, one run per `interval` tick.
    ///
    /// Stops at the first run that fails with an error.
    pub async fn analyze_repeat<S, D>(
        &self,
        source: &mut S,
        detector: &mut D,
        times: usize,
        interval: Duration,
    ) -> Result<Vec<RunOutcome>, AnalysisError>
    where
        S: FrameSource,
        D: LandmarkDetector<S::Frame>,
    {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        let mut outcomes = Vec::new();

        for run in 0..times {
            ticker.tick().await;
            info!("repeat run {}/{}", run + 1, times);
            outcomes.push(self.analyze(source, detector).await?);
        }

        Ok(outcomes)
    }
}
