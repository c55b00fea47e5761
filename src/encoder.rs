//! Consumer report encoding
//!
//! Wraps vitals and drowsiness snapshots in a self-describing JSON report
//! with producer metadata and a computation timestamp.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ComputeError;
use crate::types::{DrowsinessSnapshot, SessionReport, VitalsSnapshot};
use crate::{PRODUCER_NAME, PULSECAM_VERSION};

/// Schema tag carried by every report
pub const REPORT_SCHEMA: &str = "pulsecam.report.v1";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// One report handed to the consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorReport {
    pub schema: String,
    pub producer: ReportProducer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub computed_at_utc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitals: Option<VitalsSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drowsiness: Option<DrowsinessSnapshot>,
    /// Trimmed filtered pulse trace of the session
    #[serde(default)]
    pub waveform: Vec<f64>,
    /// Raw increments the session collected
    #[serde(default)]
    pub samples: usize,
}

/// Report encoder with a stable instance id
pub struct SnapshotEncoder {
    instance_id: String,
}

impl Default for SnapshotEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotEncoder {
    /// Create an encoder with a fresh instance id
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Combine a finished session and the latest drowsiness state
    pub fn encode(
        &self,
        session: Option<&SessionReport>,
        drowsiness: Option<&DrowsinessSnapshot>,
    ) -> MonitorReport {
        MonitorReport {
            schema: REPORT_SCHEMA.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: PULSECAM_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            session_id: session.map(|s| s.session_id.clone()),
            computed_at_utc: Utc::now().to_rfc3339(),
            vitals: session.map(|s| s.vitals),
            drowsiness: drowsiness.copied(),
            waveform: session.map(|s| s.waveform.clone()).unwrap_or_default(),
            samples: session.map_or(0, |s| s.samples),
        }
    }

    pub fn encode_session(&self, session: &SessionReport) -> MonitorReport {
        self.encode(Some(session), None)
    }

    pub fn encode_drowsiness(&self, drowsiness: &DrowsinessSnapshot) -> MonitorReport {
        self.encode(None, Some(drowsiness))
    }

    /// Serialize a report to compact JSON
    pub fn to_json(&self, report: &MonitorReport) -> Result<String, ComputeError> {
        serde_json::to_string(report).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    pub fn to_json_pretty(&self, report: &MonitorReport) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(report)
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    pub fn encode_session_to_json(&self, session: &SessionReport) -> Result<String, ComputeError> {
        self.to_json(&self.encode_session(session))
    }

    pub fn encode_drowsiness_to_json(
        &self,
        drowsiness: &DrowsinessSnapshot,
    ) -> Result<String, ComputeError> {
        self.to_json(&self.encode_drowsiness(drowsiness))
    }
}
