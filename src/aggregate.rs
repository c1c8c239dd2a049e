// src/aggregate.rs - Reduce a finger's angle series into ROM values
use serde::Serialize;

use crate::config::MeasurementMode;
use crate::extractor::{JointAngles, Joint};
use crate::geometry::AngleConvention;
use crate::series::FingerSeries;

/// Result for a single joint, in degrees. All values are >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JointRom {
    FlexExt { flex: f64, ext: f64 },
    Arc { arc: f64 },
}

/// Why an EXT_OK result may understate extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceCaveat {
    /// The most extended frame was the first accepted sample.
    FirstSample,
    /// The most extended frame was the last accepted sample.
    LastSample,
}

impl ReferenceCaveat {
    pub fn message(self) -> &'static str {
        match self {
            ReferenceCaveat::FirstSample => {
                "reference frame is the first sample; true extension may precede the captured window"
            }
            ReferenceCaveat::LastSample => {
                "reference frame is the last sample; true extension may follow the captured window"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceFrame {
    pub index: usize,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FingerRom {
    pub mcp: JointRom,
    pub pip: JointRom,
    pub dip: JointRom,
    pub frames: usize,
    pub reference: Option<ReferenceFrame>,
    pub caveat: Option<ReferenceCaveat>,
}

impl FingerRom {
    pub fn joint(&self, joint: Joint) -> JointRom {
        match joint {
            Joint::Mcp => self.mcp,
            Joint::Pip => self.pip,
            Joint::Dip => self.dip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FingerOutcome {
    Measured(FingerRom),
    NoValidFrames,
}

impl FingerOutcome {
    pub fn measured(&self) -> Option<&FingerRom> {
        match self {
            FingerOutcome::Measured(rom) => Some(rom),
            FingerOutcome::NoValidFrames => None,
        }
    }
}

/// Reduce one series. Readings are mapped back onto the included-angle scale
/// first, so the output does not depend on the run's angle convention.
pub fn aggregate(series: &FingerSeries, mode: MeasurementMode, convention: AngleConvention) -> FingerOutcome {
    let included: Vec<JointAngles> = series
        .readings()
        .iter()
        .map(|r| r.angles.map(|v| convention.to_included(v)))
        .collect();

    if included.is_empty() {
        return FingerOutcome::NoValidFrames;
    }

    let (min, max) = extrema(&included);

    let rom = match mode {
        MeasurementMode::ExtOk => {
            let index = reference_index(&included);
            let reference = included[index];
            let per_joint = |joint: Joint| JointRom::FlexExt {
                flex: (reference.get(joint) - min.get(joint)).max(0.0),
                ext: (max.get(joint) - reference.get(joint)).max(0.0),
            };
            let caveat = if index == 0 {
                Some(ReferenceCaveat::FirstSample)
            } else if index == included.len() - 1 {
                Some(ReferenceCaveat::LastSample)
            } else {
                None
            };
            FingerRom {
                mcp: per_joint(Joint::Mcp),
                pip: per_joint(Joint::Pip),
                dip: per_joint(Joint::Dip),
                frames: included.len(),
                reference: Some(ReferenceFrame {
                    index,
                    timestamp: series.readings()[index].timestamp,
                }),
                caveat,
            }
        }
        MeasurementMode::ExtNg => {
            let per_joint = |joint: Joint| JointRom::Arc {
                arc: (max.get(joint) - min.get(joint)).max(0.0),
            };
            FingerRom {
                mcp: per_joint(Joint::Mcp),
                pip: per_joint(Joint::Pip),
                dip: per_joint(Joint::Dip),
                frames: included.len(),
                reference: None,
                caveat: None,
            }
        }
    };

    FingerOutcome::Measured(rom)
}

// First occurrence of the highest score wins.
fn reference_index(readings: &[JointAngles]) -> usize {
    let mut best = 0;
    for (i, angles) in readings.iter().enumerate().skip(1) {
        if angles.score() > readings[best].score() {
            best = i;
        }
    }
    best
}

fn extrema(readings: &[JointAngles]) -> (JointAngles, JointAngles) {
    let first = readings[0];
    readings.iter().skip(1).fold((first, first), |(lo, hi), a| {
        (
            JointAngles::new(lo.mcp.min(a.mcp), lo.pip.min(a.pip), lo.dip.min(a.dip)),
            JointAngles::new(hi.mcp.max(a.mcp), hi.pip.max(a.pip), hi.dip.max(a.dip)),
        )
    })
}
