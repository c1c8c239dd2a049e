// src/geometry.rs - Joint angle math on 3D landmark vectors
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::source::Landmark;

/// Angle at vertex `b` between the rays `b -> a` and `b -> c`, in degrees.
///
/// Returns `None` when either ray has zero length (coincident points).
/// The result is always within [0, 180].
pub fn joint_angle(a: &Landmark, b: &Landmark, c: &Landmark) -> Option<f64> {
    let v1 = a.to_vector() - b.to_vector();
    let v2 = c.to_vector() - b.to_vector();
    angle_between_vectors(&v1, &v2).map(f64::to_degrees)
}

// Radians. Cosine is clamped so rounding overshoot never reaches acos as NaN.
pub(crate) fn angle_between_vectors(v1: &Vector3<f64>, v2: &Vector3<f64>) -> Option<f64> {
    let mag1 = v1.norm();
    let mag2 = v2.norm();

    if mag1 == 0.0 || mag2 == 0.0 || !mag1.is_finite() || !mag2.is_finite() {
        return None;
    }

    let cos_angle = (v1.dot(v2) / (mag1 * mag2)).clamp(-1.0, 1.0);
    Some(cos_angle.acos())
}

/// How a raw included angle is reported for a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleConvention {
    /// Raw angle at the joint: ~180 when straight, falling towards 0 when bent.
    #[default]
    Included,
    /// `180 - raw`: ~0 when straight, growing with flexion.
    Flexion,
}

impl AngleConvention {
    pub fn apply(self, included: f64) -> f64 {
        match self {
            AngleConvention::Included => included,
            AngleConvention::Flexion => 180.0 - included,
        }
    }

    /// Inverse of [`AngleConvention::apply`].
    pub fn to_included(self, reported: f64) -> f64 {
        match self {
            AngleConvention::Included => reported,
            AngleConvention::Flexion => 180.0 - reported,
        }
    }
}
