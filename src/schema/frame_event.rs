//! pulsecam.frame_event.v1 schema definition
//!
//! One line of a recorded monitoring run. A recording interleaves the two
//! drivers of a live monitor:
//! - `frame` events carry the detector output for one video frame
//!   (`landmarks: null` when no face was found)
//! - `inference` events carry one batch of raw rPPG increments
//!   (`values: null` when the model was not loaded yet)
//! - `start` and `stop` bracket an rPPG session

use serde::{Deserialize, Serialize};

use crate::types::MIN_FACE_LANDMARKS;

/// Current schema version
pub const SCHEMA_VERSION: &str = "pulsecam.frame_event.v1";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Start an rPPG session
    Start,
    /// Cancel the running rPPG session
    Stop,
    /// Landmark detector output
    Frame,
    /// Inference model output
    Inference,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Stop => "stop",
            EventKind::Frame => "frame",
            EventKind::Inference => "inference",
        }
    }
}

/// One recorded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEvent {
    /// Schema version, assumed current when absent
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Milliseconds since the start of the recording
    pub t_ms: u64,
    pub kind: EventKind,
    /// Normalized `[x, y]` landmark positions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<Vec<[f64; 2]>>,
    /// Raw rPPG increments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
}

impl FrameEvent {
    fn bare(t_ms: u64, kind: EventKind) -> Self {
        FrameEvent {
            schema_version: SCHEMA_VERSION.to_string(),
            t_ms,
            kind,
            landmarks: None,
            values: None,
        }
    }

    pub fn start(t_ms: u64) -> Self {
        Self::bare(t_ms, EventKind::Start)
    }

    pub fn stop(t_ms: u64) -> Self {
        Self::bare(t_ms, EventKind::Stop)
    }

    /// Frame with a detected face
    pub fn face(t_ms: u64, landmarks: Vec<[f64; 2]>) -> Self {
        FrameEvent {
            landmarks: Some(landmarks),
            ..Self::bare(t_ms, EventKind::Frame)
        }
    }

    /// Frame where the detector found no face
    pub fn no_face(t_ms: u64) -> Self {
        Self::bare(t_ms, EventKind::Frame)
    }

    pub fn inference(t_ms: u64, values: Vec<f64>) -> Self {
        FrameEvent {
            values: Some(values),
            ..Self::bare(t_ms, EventKind::Inference)
        }
    }

    pub fn model_not_ready(t_ms: u64) -> Self {
        Self::bare(t_ms, EventKind::Inference)
    }

    /// Validate the event schema
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        match (self.kind, &self.landmarks, &self.values) {
            (EventKind::Start | EventKind::Stop, None, None) => Ok(()),
            (EventKind::Frame, Some(points), None) if points.len() < MIN_FACE_LANDMARKS => {
                Err(ValidationError::TooFewLandmarks {
                    expected: MIN_FACE_LANDMARKS,
                    actual: points.len(),
                })
            }
            (EventKind::Frame, _, None) => Ok(()),
            (EventKind::Inference, None, _) => Ok(()),
            _ => Err(ValidationError::PayloadKindMismatch {
                kind: self.kind.as_str().to_string(),
                payload: self.payload_name().to_string(),
            }),
        }
    }

    fn payload_name(&self) -> &'static str {
        match (&self.landmarks, &self.values) {
            (Some(_), Some(_)) => "landmarks and values",
            (Some(_), None) => "landmarks",
            (None, Some(_)) => "values",
            (None, None) => "none",
        }
    }
}

/// Validation errors for frame events
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Payload mismatch: kind is {kind} but payload is {payload}")]
    PayloadKindMismatch { kind: String, payload: String },

    #[error("Too few landmarks: expected at least {expected}, got {actual}")]
    TooFewLandmarks { expected: usize, actual: usize },

    #[error("Timestamp went backwards: {current} ms after {previous} ms")]
    OutOfOrder { previous: u64, current: u64 },
}
