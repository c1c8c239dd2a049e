// src/video.rs - Video file frame source backed by ffprobe/ffmpeg
use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

use anyhow::{Context, Result};
use image::DynamicImage;
use once_cell::sync::Lazy;
use tokio::process::Command;
use tracing::{debug, info};

use crate::source::FrameSource;

static FFPROBE_AVAILABLE: Lazy<bool> =
    Lazy::new(|| StdCommand::new("ffprobe").arg("-version").output().is_ok());
static FFMPEG_AVAILABLE: Lazy<bool> =
    Lazy::new(|| StdCommand::new("ffmpeg").arg("-version").output().is_ok());

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration: f64,
}

/// Seeks by extracting the single frame at the requested time with ffmpeg.
pub struct VideoFileSource {
    path: PathBuf,
    info: VideoInfo,
    current_time: f64,
    current_frame: Option<DynamicImage>,
    scale_width: Option<u32>,
}

impl VideoFileSource {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(anyhow::anyhow!("Video file does not exist: {}", path.display()));
        }
        if let Err(e) = std::fs::File::open(&path) {
            return Err(anyhow::anyhow!("Cannot read video file (permission denied): {}", e));
        }
        if !*FFPROBE_AVAILABLE {
            return Err(anyhow::anyhow!(
                "FFmpeg is not installed or not in PATH. Please install FFmpeg to process videos."
            ));
        }

        let output = Command::new("ffprobe")
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height,r_frame_rate:format=duration"])
            .args(["-of", "default=noprint_wrappers=1"])
            .arg(&path)
            .output()
            .await
            .context("Failed to run ffprobe")?;

        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))?;
        info!(
            "Opened {} ({}x{}, {:.2} fps, {:.2}s)",
            path.display(),
            info.width,
            info.height,
            info.fps,
            info.duration
        );

        Ok(Self {
            path,
            info,
            current_time: 0.0,
            current_frame: None,
            scale_width: None,
        })
    }

    /// Downscale extracted frames to this width before detection.
    pub fn with_scale_width(mut self, width: u32) -> Self {
        self.scale_width = Some(width);
        self
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    async fn extract_frame(&self, t: f64) -> Result<DynamicImage> {
        if !*FFMPEG_AVAILABLE {
            return Err(anyhow::anyhow!("FFmpeg is not installed. Please install FFmpeg to process videos."));
        }

        let frame_path = std::env::temp_dir().join(format!("finger_rom_{}.png", uuid::Uuid::new_v4()));

        let seek_to = format!("{t:.3}");
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-y", "-ss", seek_to.as_str(), "-i"])
            .arg(&self.path)
            .args(["-frames:v", "1"]);
        if let Some(width) = self.scale_width {
            let filter = format!("scale={width}:-2");
            cmd.args(["-vf", filter.as_str()]);
        }
        let status = cmd
            .arg(&frame_path)
            .status()
            .await
            .context("Failed to extract frame with ffmpeg")?;

        let result = if status.success() {
            image::open(&frame_path).with_context(|| format!("No frame decoded at {t:.3}s"))
        } else {
            Err(anyhow::anyhow!("FFmpeg frame extraction failed at {:.3}s", t))
        };

        let _ = tokio::fs::remove_file(&frame_path).await;
        result
    }
}

impl FrameSource for VideoFileSource {
    type Frame = DynamicImage;

    fn duration(&self) -> f64 {
        self.info.duration
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    async fn seek(&mut self, t: f64) -> Result<()> {
        // Clamp so the inclusive endpoint still lands on a decodable frame.
        let last_frame = (self.info.duration - 1.0 / self.info.fps.max(1.0)).max(0.0);
        let target = t.min(last_frame);
        debug!("extracting frame at {:.3}s", target);
        self.current_frame = None;
        let frame = self.extract_frame(target).await?;
        self.current_frame = Some(frame);
        self.current_time = t;
        Ok(())
    }

    async fn capture(&mut self) -> Result<DynamicImage> {
        self.current_frame
            .take()
            .ok_or_else(|| anyhow::anyhow!("No frame ready at {:.3}s", self.current_time))
    }
}

fn parse_probe_output(text: &str) -> Result<VideoInfo> {
    let mut width = None;
    let mut height = None;
    let mut fps = None;
    let mut duration = None;

    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "width" => width = value.parse().ok(),
            "height" => height = value.parse().ok(),
            "r_frame_rate" => fps = parse_frame_rate(value),
            "duration" => duration = value.parse::<f64>().ok(),
            _ => {}
        }
    }

    let width = width.ok_or_else(|| anyhow::anyhow!("Invalid video width"))?;
    let height = height.ok_or_else(|| anyhow::anyhow!("Invalid video height"))?;
    let duration = duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| anyhow::anyhow!("Invalid video duration"))?;

    Ok(VideoInfo {
        width,
        height,
        fps: fps.unwrap_or(30.0),
        duration,
    })
}

fn parse_frame_rate(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => value.parse().ok(),
    }
    .filter(|fps| *fps > 0.0)
}
