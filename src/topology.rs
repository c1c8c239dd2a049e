// src/topology.rs - Finger to landmark index table
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// MediaPipe hand landmark indices
pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// The four landmarks a finger's three joint angles are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerTopology {
    pub mcp: usize,
    pub pip: usize,
    pub dip: usize,
    pub tip: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn topology(self) -> FingerTopology {
        match self {
            // The thumb has no DIP; its slots hold CMC, MCP, IP and TIP.
            Finger::Thumb => FingerTopology { mcp: THUMB_CMC, pip: THUMB_MCP, dip: THUMB_IP, tip: THUMB_TIP },
            Finger::Index => FingerTopology { mcp: INDEX_MCP, pip: INDEX_PIP, dip: INDEX_DIP, tip: INDEX_TIP },
            Finger::Middle => FingerTopology { mcp: MIDDLE_MCP, pip: MIDDLE_PIP, dip: MIDDLE_DIP, tip: MIDDLE_TIP },
            Finger::Ring => FingerTopology { mcp: RING_MCP, pip: RING_PIP, dip: RING_DIP, tip: RING_TIP },
            Finger::Pinky => FingerTopology { mcp: PINKY_MCP, pip: PINKY_PIP, dip: PINKY_DIP, tip: PINKY_TIP },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinky => "pinky",
        }
    }
}

impl fmt::Display for Finger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Finger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Finger::ALL
            .into_iter()
            .find(|finger| finger.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown finger '{s}'"))
    }
}

/// Examination group picked by the operator.
///
/// The thumb exam reads index and middle as references; the default exam
/// reads ring and pinky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerGroup {
    Thumb,
    #[default]
    Pinky,
}

impl FingerGroup {
    pub fn fingers(self) -> Vec<Finger> {
        match self {
            FingerGroup::Thumb => vec![Finger::Index, Finger::Middle],
            FingerGroup::Pinky => vec![Finger::Ring, Finger::Pinky],
        }
    }
}
