//! Error types for Pulsecam

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Insufficient data: need at least {required} samples, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Non-finite value in signal: {0}")]
    NonFiniteSignal(String),

    #[error("Invalid landmark frame: {0}")]
    InvalidLandmarks(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("An rPPG session is already recording")]
    SessionActive,

    #[error("No rPPG session is recording")]
    NoActiveSession,

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl ComputeError {
    /// Whether this error means "not enough signal yet" rather than a fault.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, ComputeError::InsufficientData { .. })
    }
}
