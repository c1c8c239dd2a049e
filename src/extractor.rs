// src/extractor.rs - Per-frame joint angles for one finger
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::McpReference;
use crate::geometry::{joint_angle, AngleConvention};
use crate::source::{HandLandmarks, Landmark};
use crate::topology::{Finger, INDEX_MCP, MIDDLE_MCP, PINKY_MCP, RING_MCP, WRIST};

/// One finger's three joint angles from a single frame, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointAngles {
    pub mcp: f64,
    pub pip: f64,
    pub dip: f64,
}

impl JointAngles {
    pub fn new(mcp: f64, pip: f64, dip: f64) -> Self {
        Self { mcp, pip, dip }
    }

    pub fn score(&self) -> f64 {
        self.mcp + self.pip + self.dip
    }

    pub fn get(&self, joint: Joint) -> f64 {
        match joint {
            Joint::Mcp => self.mcp,
            Joint::Pip => self.pip,
            Joint::Dip => self.dip,
        }
    }

    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.mcp), f(self.pip), f(self.dip))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Joint {
    Mcp,
    Pip,
    Dip,
}

impl Joint {
    pub const ALL: [Joint; 3] = [Joint::Mcp, Joint::Pip, Joint::Dip];

    pub fn label(self) -> &'static str {
        match self {
            Joint::Mcp => "MCP",
            Joint::Pip => "PIP",
            Joint::Dip => "DIP",
        }
    }
}

/// Turns a landmark set into joint readings for the configured fingers.
#[derive(Debug, Clone, Copy, Default)]
pub struct JointExtractor {
    convention: AngleConvention,
    mcp_reference: McpReference,
}

impl JointExtractor {
    pub fn new(convention: AngleConvention, mcp_reference: McpReference) -> Self {
        Self {
            convention,
            mcp_reference,
        }
    }

    /// All three angles, or `None` if any of them is undefined.
    pub fn extract(&self, finger: Finger, landmarks: &HandLandmarks) -> Option<JointAngles> {
        let t = finger.topology();
        let proximal = self.proximal_reference(landmarks);

        let mcp = joint_angle(&proximal, &landmarks[t.mcp], &landmarks[t.pip]);
        let pip = joint_angle(&landmarks[t.mcp], &landmarks[t.pip], &landmarks[t.dip]);
        let dip = joint_angle(&landmarks[t.pip], &landmarks[t.dip], &landmarks[t.tip]);

        // All or nothing: a finger-frame never contributes a partial triple.
        let angles = JointAngles::new(mcp?, pip?, dip?);
        Some(angles.map(|raw| self.convention.apply(raw)))
    }

    fn proximal_reference(&self, landmarks: &HandLandmarks) -> Landmark {
        match self.mcp_reference {
            McpReference::Wrist => landmarks[WRIST],
            McpReference::PalmCenter => {
                let palm_center = [INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP]
                    .iter()
                    .map(|&i| landmarks[i].to_vector())
                    .sum::<Vector3<f64>>()
                    / 4.0;
                Landmark::from_vector(&palm_center)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::source::HAND_LANDMARK_COUNT;

    /// A flat open hand: every finger a straight ray out of the wrist.
    pub(crate) fn open_hand() -> HandLandmarks {
        let mut points = vec![Landmark::new(0.5, 0.9, 0.0); HAND_LANDMARK_COUNT];
        for finger in Finger::ALL {
            let t = finger.topology();
            let dx = (t.mcp as f64 - 10.0) * 0.01;
            for (step, idx) in [t.mcp, t.pip, t.dip, t.tip].into_iter().enumerate() {
                let k = 1.0 + step as f64;
                points[idx] = Landmark::new(0.5 + dx * k, 0.9 - 0.1 * k, 0.0);
            }
        }
        HandLandmarks::try_from(points).unwrap()
    }

    fn with_point(hand: &HandLandmarks, index: usize, lm: Landmark) -> HandLandmarks {
        let mut points = hand.points().to_vec();
        points[index] = lm;
        HandLandmarks::try_from(points).unwrap()
    }

    #[test]
    fn open_hand_is_straight() {
        let angles = JointExtractor::default()
            .extract(Finger::Pinky, &open_hand())
            .unwrap();
        for joint in Joint::ALL {
            assert!((angles.get(joint) - 180.0).abs() < 1e-6, "{joint:?}");
        }
        assert!((angles.score() - 540.0).abs() < 1e-6);
    }

    #[test]
    fn bent_pip_reads_ninety() {
        let hand = open_hand();
        let t = Finger::Index.topology();
        let pip = hand[t.pip];
        let mcp = hand[t.mcp];
        // Fold the middle phalanx perpendicular to the proximal one, in depth.
        let seg = (pip.to_vector() - mcp.to_vector()).norm();
        let dip = Landmark::new(pip.x, pip.y, pip.z + seg);
        let tip = Landmark::new(pip.x, pip.y, pip.z + 2.0 * seg);
        let hand = with_point(&with_point(&hand, t.dip, dip), t.tip, tip);

        let angles = JointExtractor::default().extract(Finger::Index, &hand).unwrap();
        assert!((angles.pip - 90.0).abs() < 1e-6);
        assert!((angles.dip - 180.0).abs() < 1e-6);
        assert!((angles.mcp - 180.0).abs() < 1e-6);
    }

    #[test]
    fn undefined_dip_discards_whole_triple() {
        let hand = open_hand();
        let t = Finger::Pinky.topology();
        // Tip on top of the DIP: MCP and PIP stay valid, DIP is undefined.
        let hand = with_point(&hand, t.tip, hand[t.dip]);

        let extractor = JointExtractor::default();
        assert!(joint_angle(&hand[WRIST], &hand[t.mcp], &hand[t.pip]).is_some());
        assert!(joint_angle(&hand[t.mcp], &hand[t.pip], &hand[t.dip]).is_some());
        assert_eq!(extractor.extract(Finger::Pinky, &hand), None);
        // Other fingers in the same frame are unaffected.
        assert!(extractor.extract(Finger::Ring, &hand).is_some());
    }

    #[test]
    fn flexion_convention_reports_deviation() {
        let extractor = JointExtractor::new(AngleConvention::Flexion, McpReference::Wrist);
        let angles = extractor.extract(Finger::Ring, &open_hand()).unwrap();
        assert!(angles.mcp.abs() < 1e-6);
        assert!(angles.pip.abs() < 1e-6);
    }

    #[test]
    fn palm_center_survives_wrist_on_mcp() {
        let hand = open_hand();
        let t = Finger::Middle.topology();
        let hand = with_point(&hand, WRIST, hand[t.mcp]);

        assert_eq!(JointExtractor::default().extract(Finger::Middle, &hand), None);

        let extractor = JointExtractor::new(AngleConvention::Included, McpReference::PalmCenter);
        let angles = extractor.extract(Finger::Middle, &hand).unwrap();
        assert!((0.0..=180.0).contains(&angles.mcp));
    }
}
