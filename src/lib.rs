//! Pulsecam - Camera-only vital signs and drowsiness estimation
//!
//! Pulsecam turns two per-frame inputs from external models into display
//! snapshots:
//!
//! - **rPPG path**: raw pulse increments from an inference model are collected
//!   for a timed session, integrated, band-pass filtered and reduced to heart
//!   rate, respiration rate and a stress stage by spectral peak search.
//! - **Drowsiness path**: face-mesh landmarks give eye aspect ratio and head
//!   pose every frame; a rolling window of them drives a persistent,
//!   homeostatic drowsiness score.
//!
//! [`FaceMonitor`] holds the state of one monitoring run and is the entry
//! point for live use. [`pipeline::replay`] runs a recorded
//! `pulsecam.frame_event.v1` stream through the same monitor.

pub mod config;
pub mod drowsiness;
pub mod ear;
pub mod encoder;
pub mod error;
pub mod filter;
pub mod head_pose;
pub mod pipeline;
pub mod reconstruct;
pub mod schema;
pub mod session;
pub mod spectrum;
pub mod types;
pub mod vitals;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

#[cfg(feature = "cli")]
pub mod logging;

pub use config::{DrowsinessConfig, MonitorConfig, VitalsConfig};
pub use drowsiness::{DrowsinessAnalyzer, DrowsinessScore, DrowsinessScorer, RiskFactors};
pub use encoder::{MonitorReport, SnapshotEncoder};
pub use error::ComputeError;
pub use pipeline::{replay, ReplaySummary};
pub use session::{FaceMonitor, FrameOutcome, SessionHandle, TickOutcome};
pub use types::{
    Detection, DrowsinessComment, DrowsinessSnapshot, InferenceResult, LandmarkFrame,
    SessionReport, VitalsSnapshot,
};

// Schema exports
pub use schema::{FrameEvent, FrameEventAdapter, SCHEMA_VERSION};

/// Pulsecam version embedded in every report
pub const PULSECAM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "pulsecam";
