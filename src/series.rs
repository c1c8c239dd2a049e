// src/series.rs - Run-scoped accumulation of accepted joint readings
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::extractor::{JointAngles, JointExtractor};
use crate::source::HandLandmarks;
use crate::topology::Finger;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub timestamp: f64,
    pub angles: JointAngles,
    pub score: f64,
}

/// Accepted readings for one finger, in sampling order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FingerSeries {
    readings: Vec<Reading>,
}

impl FingerSeries {
    pub fn push(&mut self, timestamp: f64, angles: JointAngles) {
        self.readings.push(Reading {
            timestamp,
            angles,
            score: angles.score(),
        });
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl FromIterator<JointAngles> for FingerSeries {
    fn from_iter<I: IntoIterator<Item = JointAngles>>(iter: I) -> Self {
        let mut series = FingerSeries::default();
        for (i, angles) in iter.into_iter().enumerate() {
            series.push(i as f64, angles);
        }
        series
    }
}

/// Everything one analysis run accumulates. Created per run, never shared.
#[derive(Debug)]
pub struct RunContext {
    extractor: JointExtractor,
    series: BTreeMap<Finger, FingerSeries>,
    sampled: usize,
    detected: usize,
}

impl RunContext {
    pub fn new(fingers: &[Finger], extractor: JointExtractor) -> Self {
        Self {
            extractor,
            series: fingers.iter().map(|&f| (f, FingerSeries::default())).collect(),
            sampled: 0,
            detected: 0,
        }
    }

    /// Record one sampled timestamp and whatever the detector returned for it.
    pub fn observe(&mut self, t: f64, landmarks: Option<&HandLandmarks>) {
        self.sampled += 1;
        let Some(landmarks) = landmarks else {
            return;
        };
        self.detected += 1;

        for (finger, series) in self.series.iter_mut() {
            match self.extractor.extract(*finger, landmarks) {
                Some(angles) => series.push(t, angles),
                None => debug!("t={:.2}s {}: degenerate geometry, frame discarded", t, finger),
            }
        }
    }

    pub fn sampled(&self) -> usize {
        self.sampled
    }

    pub fn detected(&self) -> usize {
        self.detected
    }

    pub fn series(&self, finger: Finger) -> Option<&FingerSeries> {
        self.series.get(&finger)
    }

    pub fn into_series(self) -> BTreeMap<Finger, FingerSeries> {
        self.series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::tests::open_hand;

    #[test]
    fn counts_samples_and_detections() {
        let mut ctx = RunContext::new(&[Finger::Ring, Finger::Pinky], JointExtractor::default());
        let hand = open_hand();
        ctx.observe(0.0, Some(&hand));
        ctx.observe(0.5, None);
        ctx.observe(1.0, Some(&hand));

        assert_eq!(ctx.sampled(), 3);
        assert_eq!(ctx.detected(), 2);
        let pinky = ctx.series(Finger::Pinky).unwrap();
        assert_eq!(pinky.len(), 2);
        assert_eq!(pinky.readings()[1].timestamp, 1.0);
        assert!(ctx.series(Finger::Index).is_none());
    }

    #[test]
    fn score_is_sum_of_joints() {
        let series: FingerSeries = [JointAngles::new(170.0, 160.0, 150.0)].into_iter().collect();
        assert_eq!(series.readings()[0].score, 480.0);
    }
}
