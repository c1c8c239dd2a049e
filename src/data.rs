// src/data.rs - Rendering and export of run results
use std::fmt::Write as _;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use csv::Writer;
use serde::Serialize;

use crate::aggregate::{FingerOutcome, JointRom};
use crate::analysis::{RunOutcome, RunReport};
use crate::extractor::Joint;

#[derive(Debug, Serialize)]
struct ReadingRecord {
    finger: String,
    frame: usize,
    timestamp: f64,
    mcp: f64,
    pip: f64,
    dip: f64,
    score: f64,
    reference: bool,
}

/// Default export location: `~/Documents/FingerRom`, or `./output` without a home.
pub fn default_output_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|p| p.join("FingerRom")))
        .unwrap_or_else(|| PathBuf::from("./output"))
}

pub struct DataExporter {
    output_dir: PathBuf,
    session_name: String,
}

impl DataExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
        }
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    /// Accepted per-frame readings, one row per finger and frame.
    pub fn export_csv(&self, report: &RunReport) -> Result<PathBuf> {
        let csv_path = self.session_dir().join("readings.csv");
        ensure_parent(&csv_path)?;

        let file = File::create(&csv_path)?;
        let mut writer = Writer::from_writer(file);

        for (finger, readings) in &report.readings {
            let reference = report
                .fingers
                .get(finger)
                .and_then(FingerOutcome::measured)
                .and_then(|rom| rom.reference)
                .map(|r| r.index);

            for (frame, reading) in readings.iter().enumerate() {
                writer.serialize(ReadingRecord {
                    finger: finger.to_string(),
                    frame,
                    timestamp: reading.timestamp,
                    mcp: reading.angles.mcp,
                    pip: reading.angles.pip,
                    dip: reading.angles.dip,
                    score: reading.score,
                    reference: reference == Some(frame),
                })?;
            }
        }

        writer.flush()?;
        Ok(csv_path)
    }

    pub fn export_json(&self, outcome: &RunOutcome) -> Result<PathBuf> {
        let json_path = self.session_dir().join("report.json");
        ensure_parent(&json_path)?;

        let file = File::create(&json_path)?;
        serde_json::to_writer_pretty(file, outcome)?;
        Ok(json_path)
    }

    pub fn export_text(&self, outcome: &RunOutcome) -> Result<PathBuf> {
        let text_path = self.session_dir().join("result.txt");
        ensure_parent(&text_path)?;
        std::fs::write(&text_path, render_outcome(outcome))?;
        Ok(text_path)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Human readable result, one decimal place.
pub fn render_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Completed(report) => render_report(report),
        RunOutcome::LowVisibility {
            sampled_frames,
            detected_frames,
            detection_yield,
            message,
            ..
        } => format!(
            "Low visibility: {}/{} frames detected ({:.1}%)\n{}\n",
            detected_frames,
            sampled_frames,
            detection_yield * 100.0,
            message
        ),
    }
}

pub fn render_report(report: &RunReport) -> String {
    let mut out = format!(
        "Mode {}  detected {}/{} frames ({:.1}%)\n",
        report.mode,
        report.detected_frames,
        report.sampled_frames,
        report.detection_yield * 100.0
    );

    for (finger, outcome) in &report.fingers {
        let _ = writeln!(out, "\n{finger}");
        match outcome {
            FingerOutcome::NoValidFrames => {
                let _ = writeln!(out, "no valid frames");
            }
            FingerOutcome::Measured(rom) => {
                for joint in Joint::ALL {
                    let line = match rom.joint(joint) {
                        JointRom::FlexExt { flex, ext } => {
                            format!("{}: flexion {:.1}° / extension {:.1}°", joint.label(), flex, ext)
                        }
                        JointRom::Arc { arc } => format!("{}: arc {:.1}°", joint.label(), arc),
                    };
                    let _ = writeln!(out, "{line}");
                }
                if let Some(caveat) = rom.caveat {
                    let _ = writeln!(out, "note: {}", caveat.message());
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::config::MeasurementMode;
    use crate::extractor::JointAngles;
    use crate::geometry::AngleConvention;
    use crate::series::FingerSeries;
    use crate::topology::Finger;
    use std::collections::BTreeMap;

    fn report(mode: MeasurementMode) -> RunReport {
        let series: FingerSeries = [
            JointAngles::new(170.0, 160.0, 150.0),
            JointAngles::new(120.0, 110.0, 100.0),
            JointAngles::new(175.0, 165.0, 155.0),
        ]
        .into_iter()
        .collect();

        let mut fingers = BTreeMap::new();
        fingers.insert(Finger::Pinky, aggregate(&series, mode, AngleConvention::Included));
        fingers.insert(Finger::Ring, FingerOutcome::NoValidFrames);

        let mut readings = BTreeMap::new();
        readings.insert(Finger::Pinky, series.readings().to_vec());
        readings.insert(Finger::Ring, Vec::new());

        RunReport {
            started_at: Local::now(),
            mode,
            sampled_frames: 4,
            detected_frames: 3,
            detection_yield: 0.75,
            fingers,
            readings,
        }
    }

    #[test]
    fn renders_one_decimal() {
        let text = render_report(&report(MeasurementMode::ExtOk));
        assert!(text.contains("MCP: flexion 55.0° / extension 0.0°"));
        assert!(text.contains("ring\nno valid frames"));
        assert!(text.contains("(75.0%)"));

        let text = render_report(&report(MeasurementMode::ExtNg));
        assert!(text.contains("DIP: arc 55.0°"));
    }

    #[test]
    fn renders_low_visibility() {
        let outcome = RunOutcome::LowVisibility {
            started_at: Local::now(),
            sampled_frames: 10,
            detected_frames: 6,
            detection_yield: 0.6,
            message: crate::quality::LOW_VISIBILITY_MESSAGE,
        };
        let text = render_outcome(&outcome);
        assert!(text.contains("6/10"));
        assert!(text.contains("reshoot from the side"));
    }

    #[test]
    fn exports_one_row_per_reading() {
        let dir = std::env::temp_dir().join(format!("finger_rom_{}", uuid::Uuid::new_v4()));
        let exporter = DataExporter::new(&dir, Some("test".to_string()));
        let report = report(MeasurementMode::ExtOk);

        let csv_path = exporter.export_csv(&report).unwrap();
        let mut rdr = csv::Reader::from_path(&csv_path).unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[2][0], "pinky");
        assert_eq!(&rows[2][7], "true");

        let json_path = exporter.export_json(&RunOutcome::Completed(report)).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(value["outcome"], "completed");
        assert_eq!(value["fingers"]["ring"]["status"], "no_valid_frames");
        assert_eq!(value["fingers"]["pinky"]["mcp"]["flex"], 55.0);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
