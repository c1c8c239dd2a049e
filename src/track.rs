// src/track.rs - Replay of pre-detected landmarks from a JSON track file
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::source::{FrameSource, HandLandmarks, Landmark, LandmarkDetector};

/// Frames further than this from a requested time count as missing.
pub const DEFAULT_MATCH_TOLERANCE: f64 = 0.1;

/// Detector output recorded ahead of time.
///
/// ```json
/// { "duration": 3.0,
///   "frames": [ { "t": 0.0, "landmarks": [ {"x": 0.5, "y": 0.9, "z": 0.0}, ... ] },
///               { "t": 0.5, "landmarks": null } ] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LandmarkTrack {
    /// Defaults to the last frame's timestamp.
    #[serde(default)]
    pub duration: Option<f64>,
    pub frames: Vec<TrackFrame>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackFrame {
    pub t: f64,
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
}

impl LandmarkTrack {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read landmark track {}", path.display()))?;
        let mut track: LandmarkTrack = serde_json::from_str(&text)
            .with_context(|| format!("Invalid landmark track {}", path.display()))?;
        track.frames.sort_by(|a, b| a.t.total_cmp(&b.t));
        info!("Loaded landmark track with {} frames", track.frames.len());
        Ok(track)
    }

    pub fn duration(&self) -> f64 {
        self.duration
            .or_else(|| self.frames.last().map(|f| f.t))
            .unwrap_or(f64::NAN)
    }

    fn nearest(&self, t: f64, tolerance: f64) -> Option<&TrackFrame> {
        self.frames
            .iter()
            .filter(|f| (f.t - t).abs() <= tolerance)
            .min_by(|a, b| (a.t - t).abs().total_cmp(&(b.t - t).abs()))
    }

    /// Source and detector sharing this track.
    pub fn into_replay(self, tolerance: f64) -> (TrackSource, TrackDetector) {
        let track = Arc::new(self);
        (
            TrackSource {
                track: Arc::clone(&track),
                now: 0.0,
            },
            TrackDetector { track, tolerance },
        )
    }
}

pub struct TrackSource {
    track: Arc<LandmarkTrack>,
    now: f64,
}

impl FrameSource for TrackSource {
    /// The "frame" of a replayed track is just its timestamp.
    type Frame = f64;

    fn duration(&self) -> f64 {
        self.track.duration()
    }

    fn current_time(&self) -> f64 {
        self.now
    }

    async fn seek(&mut self, t: f64) -> Result<()> {
        self.now = t;
        Ok(())
    }

    async fn capture(&mut self) -> Result<f64> {
        Ok(self.now)
    }
}

pub struct TrackDetector {
    track: Arc<LandmarkTrack>,
    tolerance: f64,
}

impl LandmarkDetector<f64> for TrackDetector {
    async fn detect(&mut self, frame: &f64) -> Result<Option<HandLandmarks>> {
        let Some(recorded) = self.track.nearest(*frame, self.tolerance) else {
            return Ok(None);
        };
        match &recorded.landmarks {
            None => Ok(None),
            Some(points) => Ok(Some(HandLandmarks::try_from(points.clone())?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> LandmarkTrack {
        let hand = vec![Landmark::new(0.1, 0.2, 0.0); 21];
        LandmarkTrack {
            duration: None,
            frames: vec![
                TrackFrame { t: 0.0, landmarks: Some(hand.clone()) },
                TrackFrame { t: 0.52, landmarks: None },
                TrackFrame { t: 1.03, landmarks: Some(hand) },
                TrackFrame { t: 1.5, landmarks: Some(vec![Landmark::new(0.0, 0.0, 0.0); 3]) },
            ],
        }
    }

    #[tokio::test]
    async fn replays_nearest_frame() {
        let (mut source, mut detector) = track().into_replay(DEFAULT_MATCH_TOLERANCE);
        assert_eq!(source.duration(), 1.5);

        source.seek(1.0).await.unwrap();
        let frame = source.capture().await.unwrap();
        assert_eq!(source.current_time(), 1.0);
        assert!(detector.detect(&frame).await.unwrap().is_some());

        assert!(detector.detect(&0.5).await.unwrap().is_none());
        assert!(detector.detect(&0.25).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_point_count_is_an_error() {
        let (_, mut detector) = track().into_replay(DEFAULT_MATCH_TOLERANCE);
        assert!(detector.detect(&1.5).await.is_err());
    }

    #[test]
    fn parses_json_track() {
        let json = r#"{"frames": [{"t": 0.0, "landmarks": null}, {"t": 2.0}]}"#;
        let track: LandmarkTrack = serde_json::from_str(json).unwrap();
        assert_eq!(track.duration(), 2.0);
        assert!(track.frames[1].landmarks.is_none());
    }
}
