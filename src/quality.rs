// src/quality.rs - Detection yield gate
use serde::Serialize;

pub const LOW_VISIBILITY_MESSAGE: &str = "insufficient visibility, reshoot from the side";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum GateOutcome {
    Pass { detection_yield: f64 },
    LowVisibility { detection_yield: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct QualityGate {
    threshold: f64,
}

impl QualityGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// A yield equal to the threshold passes.
    pub fn check(&self, detected: usize, sampled: usize) -> GateOutcome {
        self.check_yield(detection_yield(detected, sampled))
    }

    pub fn check_yield(&self, detection_yield: f64) -> GateOutcome {
        if detection_yield >= self.threshold {
            GateOutcome::Pass { detection_yield }
        } else {
            GateOutcome::LowVisibility { detection_yield }
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(0.70)
    }
}

/// Fraction of sampled frames that produced a landmark set; 0 when nothing was sampled.
pub fn detection_yield(detected: usize, sampled: usize) -> f64 {
    if sampled == 0 {
        0.0
    } else {
        detected as f64 / sampled as f64
    }
}
