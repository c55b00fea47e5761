//! Monitor configuration
//!
//! Defaults reproduce the reference cadence: 30 samples/s, 10 s rPPG
//! sessions, a 10 s EAR window and a 5 s head-pose window. Every field has a
//! serde default so partial JSON files only override what they name.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ComputeError;
use crate::filter::{BandpassConfig, MAX_FILTER_ORDER};
use crate::spectrum::FrequencyBand;

/// Largest session buffer or rolling window, in samples (10 minutes at 60 Hz)
pub const MAX_WINDOW_SAMPLES: usize = 36_000;

/// rPPG path settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalsConfig {
    /// Raw increment rate (samples per second)
    pub sample_rate_hz: f64,
    /// Session timer (seconds)
    pub session_duration_secs: f64,
    pub filter: BandpassConfig,
    /// Samples dropped from the end of the zero-phase output
    pub edge_trim_samples: usize,
    pub heart_band: FrequencyBand,
    pub respiration_band: FrequencyBand,
    /// Hz to beats per minute
    pub heart_rate_scale: f64,
    /// Hz to breaths per minute
    pub respiration_scale: f64,
    /// Resting heart-rate to respiration-rate ratio
    pub baseline_ratio: f64,
    /// Reported SpO2 (percent); not measured
    pub spo2_placeholder: u8,
    /// Smallest raw buffer worth analyzing
    pub min_samples: usize,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 30.0,
            session_duration_secs: 10.0,
            filter: BandpassConfig::default(),
            edge_trim_samples: 30,
            heart_band: FrequencyBand::new(1.0, 3.5),
            respiration_band: FrequencyBand::new(0.1, 0.7),
            heart_rate_scale: 60.0,
            respiration_scale: 40.0,
            baseline_ratio: 4.5,
            spo2_placeholder: 98,
            min_samples: 90,
        }
    }
}

impl VitalsConfig {
    /// Raw samples one session can hold
    pub fn session_capacity(&self) -> usize {
        (self.sample_rate_hz * self.session_duration_secs).round().max(0.0) as usize
    }

    /// Smallest raw buffer worth analyzing: `min_samples`, and always enough
    /// to leave two samples after the edge trim
    pub fn required_samples(&self) -> usize {
        self.min_samples.max(self.edge_trim_samples + 2)
    }

    /// Session timer in milliseconds
    pub fn session_duration_ms(&self) -> u64 {
        (self.session_duration_secs * 1000.0).round().max(0.0) as u64
    }

    fn validate(&self) -> Result<(), ComputeError> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return invalid(format!(
                "vitals.sample_rate_hz must be positive, got {}",
                self.sample_rate_hz
            ));
        }
        if !(self.session_duration_secs.is_finite() && self.session_duration_secs > 0.0) {
            return invalid(format!(
                "vitals.session_duration_secs must be positive, got {}",
                self.session_duration_secs
            ));
        }
        if self.filter.order == 0 || self.filter.order > MAX_FILTER_ORDER {
            return invalid(format!(
                "vitals.filter.order must be 1..={MAX_FILTER_ORDER}, got {}",
                self.filter.order
            ));
        }
        if !(self.filter.center_hz > 0.0 && self.filter.center_hz < self.sample_rate_hz / 2.0) {
            return invalid(format!(
                "vitals.filter.center_hz must be below Nyquist, got {}",
                self.filter.center_hz
            ));
        }
        if !(self.filter.bandwidth_octaves.is_finite() && self.filter.bandwidth_octaves > 0.0) {
            return invalid(format!(
                "vitals.filter.bandwidth_octaves must be positive, got {}",
                self.filter.bandwidth_octaves
            ));
        }
        for (name, band) in [
            ("heart_band", self.heart_band),
            ("respiration_band", self.respiration_band),
        ] {
            if !band.is_valid_for(self.sample_rate_hz) {
                return invalid(format!(
                    "vitals.{name} [{}, {}] Hz is empty or above Nyquist",
                    band.min_hz, band.max_hz
                ));
            }
        }
        if self.session_capacity() > MAX_WINDOW_SAMPLES {
            return invalid(format!(
                "vitals session holds {} samples, limit is {MAX_WINDOW_SAMPLES}",
                self.session_capacity()
            ));
        }
        if self.edge_trim_samples >= self.session_capacity() {
            return invalid(format!(
                "vitals.edge_trim_samples ({}) must be smaller than the session capacity ({})",
                self.edge_trim_samples,
                self.session_capacity()
            ));
        }
        if self.required_samples() > self.session_capacity() {
            return invalid(format!(
                "vitals session holds {} samples but analysis needs {}",
                self.session_capacity(),
                self.required_samples()
            ));
        }
        if self.spo2_placeholder > 100 {
            return invalid(format!(
                "vitals.spo2_placeholder must be a percentage, got {}",
                self.spo2_placeholder
            ));
        }
        Ok(())
    }
}

/// Facial-geometry path settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrowsinessConfig {
    /// Landmark frame rate (frames per second)
    pub fps: f64,
    /// EAR window length (seconds)
    pub ear_window_secs: f64,
    /// Yaw/pitch window length (frames)
    pub pose_window_frames: usize,
    /// EAR below this counts as a closed-eye frame
    pub closed_ear_threshold: f64,
    pub blink_band: FrequencyBand,
}

impl Default for DrowsinessConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            ear_window_secs: 10.0,
            pose_window_frames: 150,
            closed_ear_threshold: 0.2,
            blink_band: FrequencyBand::new(0.1, 0.6),
        }
    }
}

impl DrowsinessConfig {
    /// EAR window capacity in frames
    pub fn ear_window_frames(&self) -> usize {
        (self.fps * self.ear_window_secs).round().max(0.0) as usize
    }

    fn validate(&self) -> Result<(), ComputeError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return invalid(format!("drowsiness.fps must be positive, got {}", self.fps));
        }
        if self.ear_window_frames() < 2 {
            return invalid(format!(
                "drowsiness.ear_window_secs too short: {} frames",
                self.ear_window_frames()
            ));
        }
        if self.ear_window_frames() > MAX_WINDOW_SAMPLES {
            return invalid(format!(
                "drowsiness.ear_window_secs too long: {} frames, limit is {MAX_WINDOW_SAMPLES}",
                self.ear_window_frames()
            ));
        }
        if self.pose_window_frames == 0 || self.pose_window_frames > MAX_WINDOW_SAMPLES {
            return invalid(format!(
                "drowsiness.pose_window_frames must be 1..={MAX_WINDOW_SAMPLES}, got {}",
                self.pose_window_frames
            ));
        }
        if !(self.closed_ear_threshold.is_finite() && self.closed_ear_threshold > 0.0) {
            return invalid(format!(
                "drowsiness.closed_ear_threshold must be positive, got {}",
                self.closed_ear_threshold
            ));
        }
        if !self.blink_band.is_valid_for(self.fps) {
            return invalid(format!(
                "drowsiness.blink_band [{}, {}] Hz is empty or above Nyquist",
                self.blink_band.min_hz, self.blink_band.max_hz
            ));
        }
        Ok(())
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub vitals: VitalsConfig,
    pub drowsiness: DrowsinessConfig,
}

impl MonitorConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: MonitorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self, ComputeError> {
        let json = fs::read_to_string(path).map_err(|e| {
            ComputeError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(ComputeError::JsonError)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        self.vitals.validate()?;
        self.drowsiness.validate()
    }
}

fn invalid(message: String) -> Result<(), ComputeError> {
    Err(ComputeError::InvalidConfig(message))
}
