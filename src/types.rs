//! Core types for the Pulsecam pipeline
//!
//! This module defines the data that crosses component boundaries: landmark
//! frames and inference batches coming in from external collaborators, and the
//! vitals and drowsiness snapshots going out to the consumer.

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// Points produced by a face-mesh detector without iris refinement
pub const MIN_FACE_LANDMARKS: usize = 468;

/// Points produced by a face-mesh detector with iris refinement
pub const FACE_MESH_LANDMARKS: usize = 478;

/// Normalized 2D landmark position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Landmarks of one detected face in one video frame
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: Vec<Point2>,
}

impl LandmarkFrame {
    /// Wrap detector output, rejecting truncated or non-finite meshes
    pub fn new(points: Vec<Point2>) -> Result<Self, ComputeError> {
        if points.len() < MIN_FACE_LANDMARKS {
            return Err(ComputeError::InvalidLandmarks(format!(
                "expected at least {} points, got {}",
                MIN_FACE_LANDMARKS,
                points.len()
            )));
        }
        if let Some(idx) = points.iter().position(|p| !p.is_finite()) {
            return Err(ComputeError::InvalidLandmarks(format!(
                "point {idx} has a non-finite coordinate"
            )));
        }
        Ok(Self { points })
    }

    /// Build a frame from interleaved `x0, y0, x1, y1, ...` coordinates
    pub fn from_flat(coords: &[f64]) -> Result<Self, ComputeError> {
        if coords.len() % 2 != 0 {
            return Err(ComputeError::InvalidLandmarks(format!(
                "odd coordinate count {}",
                coords.len()
            )));
        }
        let points = coords
            .chunks_exact(2)
            .map(|xy| Point2::new(xy[0], xy[1]))
            .collect();
        Self::new(points)
    }

    /// Landmark at a face-mesh index. Indices below [`MIN_FACE_LANDMARKS`]
    /// always exist.
    pub fn point(&self, index: usize) -> Point2 {
        self.points[index]
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Per-frame output of the external landmark detector
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Detected(LandmarkFrame),
    NotDetected,
}

/// Per-tick output of the external rPPG inference model
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceResult {
    /// Raw increments, one per frame of the inference batch
    Values(Vec<f64>),
    ModelNotReady,
}

/// Dominant bin of a band-limited magnitude spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralPeak {
    /// Bin frequency (Hz)
    pub frequency: f64,
    /// Bin magnitude
    pub amplitude: f64,
}

/// Vital signs estimated from one completed rPPG session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalsSnapshot {
    /// Heart rate (beats per minute)
    pub heart_rate: u32,
    /// Respiration rate (breaths per minute)
    pub respiration_rate: u32,
    /// Discretized stress level, 1 (calm) to 5
    pub stress_stage: u8,
    /// Saturating stress index the stage is derived from (0-100)
    pub stress_index: u8,
    /// Oxygen saturation placeholder (percent). Not measured.
    pub spo2: u8,
}

/// Approximate head orientation in signed degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    /// Positive when the head tilts down
    pub pitch: f64,
    /// Positive when the nose sits right of the eye midpoint
    pub yaw: f64,
    /// Angle of the eye-corner line
    pub roll: f64,
}

/// Qualitative label derived from the drowsiness score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrowsinessComment {
    Normal,
    Caution,
    Danger,
}

impl DrowsinessComment {
    /// `>= 80` normal, `>= 40` caution, otherwise danger
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            DrowsinessComment::Normal
        } else if score >= 40 {
            DrowsinessComment::Caution
        } else {
            DrowsinessComment::Danger
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DrowsinessComment::Normal => "normal",
            DrowsinessComment::Caution => "caution",
            DrowsinessComment::Danger => "danger",
        }
    }
}

/// Per-frame attention state for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrowsinessSnapshot {
    /// Eye aspect ratio of this frame (average of both eyes)
    pub ear: f64,
    /// Blink rate from the most recent full EAR window
    pub blink_per_min: u32,
    /// Persistent drowsiness score (0-100, 100 = alert)
    pub score: u8,
    /// Absolute pitch (degrees)
    pub pitch: f64,
    /// Absolute yaw (degrees)
    pub yaw: f64,
    /// Absolute roll (degrees)
    pub roll: f64,
    pub comment: DrowsinessComment,
}

/// Result of analyzing one completed rPPG session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub vitals: VitalsSnapshot,
    /// Filtered pulse trace with the edge tail trimmed, for display
    pub waveform: Vec<f64>,
    /// Raw increments the session collected
    pub samples: usize,
}
