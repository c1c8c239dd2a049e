// src/config.rs - Run configuration
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::geometry::AngleConvention;
use crate::topology::{Finger, FingerGroup};

/// Whether the subject can voluntarily straighten the finger during the clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MeasurementMode {
    /// Extension achievable: report flexion and extension against a reference frame.
    #[default]
    #[serde(rename = "EXT_OK")]
    ExtOk,
    /// Extension not achievable (contracture, pain): report the arc only.
    #[serde(rename = "EXT_NG")]
    ExtNg,
}

impl fmt::Display for MeasurementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementMode::ExtOk => f.write_str("EXT_OK"),
            MeasurementMode::ExtNg => f.write_str("EXT_NG"),
        }
    }
}

impl FromStr for MeasurementMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "EXT_OK" => Ok(MeasurementMode::ExtOk),
            "EXT_NG" => Ok(MeasurementMode::ExtNg),
            _ => Err(format!("unknown mode '{s}' (expected EXT_OK or EXT_NG)")),
        }
    }
}

/// Proximal point the MCP angle is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpReference {
    /// Landmark 0.
    #[default]
    Wrist,
    /// Mean of the index, middle, ring and pinky MCP landmarks.
    PalmCenter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: MeasurementMode,
    pub fingers: Vec<Finger>,
    /// Seconds between samples.
    pub time_step: f64,
    /// Minimum detected/sampled ratio for a run to produce numbers.
    pub visibility_threshold: f64,
    pub convention: AngleConvention,
    pub mcp_reference: McpReference,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: MeasurementMode::default(),
            fingers: FingerGroup::default().fingers(),
            time_step: 0.5,
            visibility_threshold: 0.70,
            convention: AngleConvention::default(),
            mcp_reference: McpReference::default(),
        }
    }
}

impl RunConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: RunConfig = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "time step must be a positive number of seconds, got {}",
                self.time_step
            )));
        }
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(AnalysisError::InvalidConfig(format!(
                "visibility threshold must be within [0, 1], got {}",
                self.visibility_threshold
            )));
        }
        if self.fingers.is_empty() {
            return Err(AnalysisError::InvalidConfig("no fingers selected".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_clinic_protocol() {
        let config = RunConfig::default();
        assert_eq!(config.mode, MeasurementMode::ExtOk);
        assert_eq!(config.fingers, vec![Finger::Ring, Finger::Pinky]);
        assert_eq!(config.time_step, 0.5);
        assert_eq!(config.visibility_threshold, 0.70);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: RunConfig =
            serde_json::from_str(r#"{"mode": "EXT_NG", "fingers": ["index"], "mcp_reference": "palm_center"}"#)
                .unwrap();
        assert_eq!(config.mode, MeasurementMode::ExtNg);
        assert_eq!(config.fingers, vec![Finger::Index]);
        assert_eq!(config.mcp_reference, McpReference::PalmCenter);
        assert_eq!(config.time_step, 0.5);
    }

    #[test]
    fn rejects_bad_step_and_threshold() {
        let mut config = RunConfig::default();
        config.time_step = 0.0;
        assert!(matches!(config.validate(), Err(AnalysisError::InvalidConfig(_))));

        config.time_step = f64::NAN;
        assert!(config.validate().is_err());

        config.time_step = 0.5;
        config.visibility_threshold = 1.5;
        assert!(config.validate().is_err());

        config.visibility_threshold = 0.7;
        config.fingers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_mode_names() {
        assert_eq!("ext-ng".parse::<MeasurementMode>(), Ok(MeasurementMode::ExtNg));
        assert_eq!("EXT_OK".parse::<MeasurementMode>(), Ok(MeasurementMode::ExtOk));
        assert!("both".parse::<MeasurementMode>().is_err());
    }
}
