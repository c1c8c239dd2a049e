// src/lib.rs
//! Finger joint range-of-motion estimation from hand landmarks sampled over a clip.
//!
//! The pipeline seeks a [`source::FrameSource`] at a fixed step, runs a
//! [`source::LandmarkDetector`] on each frame, turns every detected hand into
//! MCP/PIP/DIP angles per finger, and reduces the accepted readings into
//! flexion/extension or arc values once the detection yield clears the
//! quality gate.

pub mod aggregate;
pub mod analysis;
pub mod config;
pub mod data;
pub mod detector;
pub mod error;
pub mod extractor;
pub mod geometry;
pub mod quality;
pub mod sampler;
pub mod series;
pub mod source;
pub mod topology;
pub mod track;
pub mod video;

pub use analysis::{Analyzer, RunOutcome, RunReport};
pub use config::{MeasurementMode, RunConfig};
pub use error::AnalysisError;
