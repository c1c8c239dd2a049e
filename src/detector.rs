// src/detector.rs - Hand landmark detector running as an external process
use std::time::Duration;

use anyhow::{Context, Result};
use image::DynamicImage;
use tokio::process::Command;
use tracing::debug;

use crate::source::{HandLandmarks, Landmark, LandmarkDetector};

/// Runs `program args... <frame.png>` once per frame.
///
/// The process must print either `null` (no hand) or a JSON array of 21
/// `{"x", "y", "z"}` points on stdout, e.g. a small MediaPipe Hands script.
pub struct CommandDetector {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandDetector {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Duration::from_secs(10),
        }
    }

    /// Split a shell-like command line on whitespace.
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty detector command"))?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl LandmarkDetector<DynamicImage> for CommandDetector {
    async fn detect(&mut self, frame: &DynamicImage) -> Result<Option<HandLandmarks>> {
        let frame_path = std::env::temp_dir().join(format!("finger_rom_detect_{}.png", uuid::Uuid::new_v4()));
        frame
            .save(&frame_path)
            .context("Failed to write frame for detector")?;

        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(&frame_path).kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, command.output()).await;
        let _ = tokio::fs::remove_file(&frame_path).await;

        let output = output
            .map_err(|_| anyhow::anyhow!("Detector timed out after {:?}", self.timeout))?
            .with_context(|| format!("Failed to run detector '{}'", self.program))?;

        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "Detector exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("detector output: {} bytes", stdout.len());
        parse_detector_output(&stdout)
    }
}

fn parse_detector_output(stdout: &str) -> Result<Option<HandLandmarks>> {
    let points: Option<Vec<Landmark>> =
        serde_json::from_str(stdout.trim()).context("Detector printed invalid JSON")?;
    points
        .map(HandLandmarks::try_from)
        .transpose()
        .map_err(Into::into)
}
