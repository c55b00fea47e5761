//! Vital sign estimation
//!
//! Maps the dominant frequencies of the reconstructed pulse trace to heart
//! rate and respiration rate, derives a stress stage from their ratio, and
//! attaches the SpO2 placeholder.
//!
//! Formulas:
//! ```text
//! heart_rate       = round(peak(1.0..3.5 Hz) * 60)
//! respiration_rate = round(peak(0.1..0.7 Hz) * 40)
//! stress_index     = tanh(|heart_rate / max(respiration_rate, 1) - 4.5|) * 100
//! stress_stage     = clamp(ceil(stress_index / 20), 1, 5)
//! ```
//! The respiration scale is 40, not 60. It is kept as configured.

use tracing::{debug, warn};

use crate::config::VitalsConfig;
use crate::error::ComputeError;
use crate::reconstruct::{ReconstructedSignal, SignalReconstructor};
use crate::spectrum::SpectralPeakFinder;
use crate::types::VitalsSnapshot;
use crate::window::PREALLOCATED_SAMPLES;

/// Raw rPPG increments collected during one session.
///
/// Bounded by the session length. Increments offered past capacity are
/// dropped and counted, so the buffer only grows within a session.
#[derive(Debug, Clone)]
pub struct RawSignalBuffer {
    samples: Vec<f64>,
    capacity: usize,
    dropped: usize,
}

impl RawSignalBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity.min(PREALLOCATED_SAMPLES)),
            capacity,
            dropped: 0,
        }
    }

    /// Append one inference batch in order, returning how many were kept
    pub fn append(&mut self, values: &[f64]) -> usize {
        let room = self.capacity.saturating_sub(self.samples.len());
        let accepted = values.len().min(room);
        self.samples.extend_from_slice(&values[..accepted]);

        let overflow = values.len() - accepted;
        if overflow > 0 {
            self.dropped += overflow;
            warn!(
                overflow,
                capacity = self.capacity,
                "raw signal buffer full, dropping increments"
            );
        }
        accepted
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Increments refused because the buffer was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.dropped = 0;
    }
}

/// Heart rate, respiration, stress and SpO2 from a session's increments
#[derive(Debug, Clone)]
pub struct VitalsEstimator {
    config: VitalsConfig,
    finder: SpectralPeakFinder,
    reconstructor: SignalReconstructor,
}

impl VitalsEstimator {
    pub fn new(config: &VitalsConfig) -> Result<Self, ComputeError> {
        Ok(Self {
            config: config.clone(),
            finder: SpectralPeakFinder::new(config.sample_rate_hz),
            reconstructor: SignalReconstructor::new(config)?,
        })
    }

    /// Smallest raw buffer this estimator analyzes
    pub fn required_samples(&self) -> usize {
        self.config.required_samples()
    }

    /// Reconstruct the pulse trace and estimate vitals from it.
    ///
    /// Fails with [`ComputeError::InsufficientData`] on an empty or short
    /// buffer instead of analyzing it.
    pub fn estimate(
        &self,
        increments: &[f64],
    ) -> Result<(VitalsSnapshot, ReconstructedSignal), ComputeError> {
        let required = self.required_samples();
        if increments.len() < required {
            warn!(
                available = increments.len(),
                required, "not enough rPPG increments for vitals"
            );
            return Err(ComputeError::InsufficientData {
                required,
                available: increments.len(),
            });
        }

        let signal = self.reconstructor.reconstruct(increments)?;
        let vitals = self.from_filtered(&signal.filtered);
        Ok((vitals, signal))
    }

    /// Estimate vitals from an already filtered and trimmed trace
    pub fn from_filtered(&self, filtered: &[f64]) -> VitalsSnapshot {
        let heart_hz = self.finder.peak_frequency(filtered, self.config.heart_band);
        let respiration_hz = self
            .finder
            .peak_frequency(filtered, self.config.respiration_band);

        let heart_rate = to_rate(heart_hz, self.config.heart_rate_scale);
        let respiration_rate = to_rate(respiration_hz, self.config.respiration_scale);
        let index = stress_index(heart_rate, respiration_rate, self.config.baseline_ratio);

        debug!(
            heart_hz,
            respiration_hz, heart_rate, respiration_rate, index, "estimated vitals"
        );

        VitalsSnapshot {
            heart_rate,
            respiration_rate,
            stress_stage: stress_stage(index),
            stress_index: index.round().clamp(0.0, 100.0) as u8,
            spo2: self.config.spo2_placeholder,
        }
    }
}

/// Frequency (Hz) to a whole per-minute rate
fn to_rate(freq_hz: f64, scale: f64) -> u32 {
    (freq_hz * scale).round().max(0.0) as u32
}

/// Saturating distance of the HR:RR ratio from its resting baseline, in [0, 100)
pub fn stress_index(heart_rate: u32, respiration_rate: u32, baseline_ratio: f64) -> f64 {
    let ratio = heart_rate as f64 / respiration_rate.max(1) as f64;
    (ratio - baseline_ratio).abs().tanh() * 100.0
}

/// Stage 1..=5 from a stress index
pub fn stress_stage(index: f64) -> u8 {
    (index / 20.0).ceil().clamp(1.0, 5.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::f64::consts::PI;

    fn estimator() -> VitalsEstimator {
        VitalsEstimator::new(&VitalsConfig::default()).unwrap()
    }

    fn tone(freq_hz: f64, amplitude: f64, n: usize) -> impl Iterator<Item = f64> {
        (0..n).map(move |i| amplitude * (2.0 * PI * freq_hz * i as f64 / 30.0).sin())
    }

    #[test]
    fn test_from_filtered_pulse_and_breath() {
        let signal: Vec<f64> = tone(1.2, 1.0, 300)
            .zip(tone(0.6, 0.8, 300))
            .map(|(a, b)| a + b)
            .collect();

        let vitals = estimator().from_filtered(&signal);
        assert_eq!(vitals.heart_rate, 72);
        assert_eq!(vitals.respiration_rate, 24);
        // 72 / 24 = 3, |3 - 4.5| = 1.5, tanh(1.5) * 100 = 90.5
        assert_eq!(vitals.stress_index, 91);
        assert_eq!(vitals.stress_stage, 5);
        assert_eq!(vitals.spo2, 98);
    }

    #[test]
    fn test_flat_trace_reports_zero_rates() {
        let vitals = estimator().from_filtered(&[0.0; 270]);
        assert_eq!(vitals.heart_rate, 0);
        assert_eq!(vitals.respiration_rate, 0);
        // 0 / max(0, 1) = 0, |0 - 4.5| saturates
        assert_eq!(vitals.stress_stage, 5);
    }

    #[test]
    fn test_stress_at_baseline_is_stage_one() {
        // 90 / 20 = 4.5 exactly
        let index = stress_index(90, 20, 4.5);
        assert_eq!(index, 0.0);
        assert_eq!(stress_stage(index), 1);
    }

    #[test]
    fn test_stress_stage_boundaries() {
        assert_eq!(stress_stage(0.0), 1);
        assert_eq!(stress_stage(20.0), 1);
        assert_eq!(stress_stage(20.1), 2);
        assert_eq!(stress_stage(59.9), 3);
        assert_eq!(stress_stage(99.9), 5);
    }

    #[test]
    fn test_zero_respiration_floors_denominator() {
        assert_eq!(stress_index(3, 0, 4.5), stress_index(3, 1, 4.5));
    }

    #[test]
    fn test_empty_buffer_is_insufficient() {
        let result = estimator().estimate(&[]);
        match result {
            Err(ComputeError::InsufficientData {
                required,
                available,
            }) => {
                assert_eq!(required, 90);
                assert_eq!(available, 0);
            }
            other => panic!("expected insufficient data, got {other:?}"),
        }
    }

    #[test]
    fn test_estimate_from_increments() {
        let wave: Vec<f64> = tone(1.2, 1.0, 301).collect();
        let increments: Vec<f64> = wave.windows(2).map(|w| w[1] - w[0]).collect();

        let (vitals, signal) = estimator().estimate(&increments).unwrap();
        assert_eq!(signal.filtered.len(), 270);
        // trimmed trace has 270 samples, bins are 1/9 Hz wide
        assert!((vitals.heart_rate as i64 - 72).abs() <= 7, "hr {}", vitals.heart_rate);
    }

    #[test]
    fn test_raw_buffer_caps_and_counts() {
        let mut buffer = RawSignalBuffer::new(5);
        assert_eq!(buffer.append(&[1.0, 2.0, 3.0]), 3);
        assert_eq!(buffer.append(&[4.0, 5.0, 6.0]), 2);

        assert!(buffer.is_full());
        assert_eq!(buffer.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buffer.dropped(), 1);

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.dropped(), 0);
    }

    #[test]
    fn test_huge_raw_buffer_does_not_allocate_up_front() {
        let mut buffer = RawSignalBuffer::new(usize::MAX);
        assert_eq!(buffer.append(&[0.5; 30]), 30);
        assert!(!buffer.is_full());
    }

    #[test]
    fn test_required_samples_follows_config() {
        let config = VitalsConfig {
            min_samples: 10,
            edge_trim_samples: 30,
            ..VitalsConfig::default()
        };
        let estimator = VitalsEstimator::new(&config).unwrap();
        assert_eq!(estimator.required_samples(), 32);
        assert_eq!(estimator.required_samples(), config.required_samples());
    }
}
