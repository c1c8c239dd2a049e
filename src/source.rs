// src/source.rs - Landmark types and the frame source / detector seams
use anyhow::Result;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Points per detected hand (MediaPipe hand layout).
pub const HAND_LANDMARK_COUNT: usize = 21;

/// One detected keypoint in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LandmarkError {
    #[error("expected {HAND_LANDMARK_COUNT} hand landmarks, got {0}")]
    WrongCount(usize),
}

/// The 21 landmarks of a single detected hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct HandLandmarks {
    points: Vec<Landmark>,
}

impl HandLandmarks {
    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }
}

impl TryFrom<Vec<Landmark>> for HandLandmarks {
    type Error = LandmarkError;

    fn try_from(points: Vec<Landmark>) -> Result<Self, Self::Error> {
        if points.len() != HAND_LANDMARK_COUNT {
            return Err(LandmarkError::WrongCount(points.len()));
        }
        Ok(Self { points })
    }
}

impl From<HandLandmarks> for Vec<Landmark> {
    fn from(hand: HandLandmarks) -> Self {
        hand.points
    }
}

impl std::ops::Index<usize> for HandLandmarks {
    type Output = Landmark;

    fn index(&self, index: usize) -> &Landmark {
        &self.points[index]
    }
}

/// A seekable clip of frames.
///
/// `seek` resolves once the frame at `t` is ready; `capture` then hands that
/// frame out for detection.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    type Frame;

    /// Clip length in seconds.
    fn duration(&self) -> f64;

    fn current_time(&self) -> f64;

    async fn seek(&mut self, t: f64) -> Result<()>;

    async fn capture(&mut self) -> Result<Self::Frame>;
}

/// Maps one frame to zero or one hand.
#[allow(async_fn_in_trait)]
pub trait LandmarkDetector<F> {
    async fn detect(&mut self, frame: &F) -> Result<Option<HandLandmarks>>;
}
