//! Band-pass filtering for the reconstructed pulse trace
//!
//! The filter is a cascade of identical second-order band-pass sections
//! (constant 0 dB peak gain, bandwidth given in octaves), applied forward and
//! then backward so the output carries no phase shift. Sections start from
//! rest, which is why the tail of the zero-phase output needs trimming.

use serde::{Deserialize, Serialize};
use std::f64::consts::{LN_2, PI};

use crate::error::ComputeError;

/// Upper bound on cascaded sections
pub const MAX_FILTER_ORDER: usize = 12;

/// Band-pass design parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandpassConfig {
    /// Center frequency (Hz)
    pub center_hz: f64,
    /// Bandwidth between -3 dB edges (octaves)
    pub bandwidth_octaves: f64,
    /// Number of cascaded second-order sections
    pub order: usize,
}

impl Default for BandpassConfig {
    fn default() -> Self {
        Self {
            center_hz: 1.5,
            bandwidth_octaves: 2.0,
            order: 2,
        }
    }
}

/// Second-order IIR section, coefficients normalized by `a0`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    fn bandpass(sample_rate_hz: f64, center_hz: f64, bandwidth_octaves: f64) -> Self {
        let w0 = 2.0 * PI * center_hz / sample_rate_hz;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 * (LN_2 / 2.0 * bandwidth_octaves * w0 / sin_w0).sinh();
        let a0 = 1.0 + alpha;

        Self {
            b0: alpha / a0,
            b1: 0.0,
            b2: -alpha / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Direct form I from rest
    fn run(&self, input: &[f64]) -> Vec<f64> {
        let (mut x1, mut x2, mut y1, mut y2) = (0.0, 0.0, 0.0, 0.0);
        input
            .iter()
            .map(|&x| {
                let y = self.b0 * x + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
                x2 = x1;
                x1 = x;
                y2 = y1;
                y1 = y;
                y
            })
            .collect()
    }
}

/// Cascaded band-pass filter
#[derive(Debug, Clone, PartialEq)]
pub struct BandpassFilter {
    stages: Vec<Biquad>,
}

impl BandpassFilter {
    /// Design the cascade for a sampling rate
    pub fn design(sample_rate_hz: f64, config: &BandpassConfig) -> Result<Self, ComputeError> {
        let nyquist = sample_rate_hz / 2.0;
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "sample rate must be positive, got {sample_rate_hz}"
            )));
        }
        if !(config.center_hz > 0.0 && config.center_hz < nyquist) {
            return Err(ComputeError::InvalidConfig(format!(
                "filter center {} Hz must lie in (0, {nyquist}) Hz",
                config.center_hz
            )));
        }
        if !(config.bandwidth_octaves.is_finite() && config.bandwidth_octaves > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "filter bandwidth must be positive, got {}",
                config.bandwidth_octaves
            )));
        }
        if config.order == 0 || config.order > MAX_FILTER_ORDER {
            return Err(ComputeError::InvalidConfig(format!(
                "filter order must be 1..={MAX_FILTER_ORDER}, got {}",
                config.order
            )));
        }

        let section = Biquad::bandpass(sample_rate_hz, config.center_hz, config.bandwidth_octaves);
        Ok(Self {
            stages: vec![section; config.order],
        })
    }

    pub fn order(&self) -> usize {
        self.stages.len()
    }

    /// Single causal pass through every section
    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        self.stages
            .iter()
            .fold(signal.to_vec(), |acc, stage| stage.run(&acc))
    }

    /// Zero-phase filtering: forward pass, reverse, forward pass, reverse.
    ///
    /// Fails on non-finite input or output instead of handing NaN downstream.
    pub fn filtfilt(&self, signal: &[f64]) -> Result<Vec<f64>, ComputeError> {
        if let Some(idx) = signal.iter().position(|v| !v.is_finite()) {
            return Err(ComputeError::NonFiniteSignal(format!(
                "filter input sample {idx} is {}",
                signal[idx]
            )));
        }

        let mut forward = self.apply(signal);
        forward.reverse();
        let mut output = self.apply(&forward);
        output.reverse();

        if output.iter().any(|v| !v.is_finite()) {
            return Err(ComputeError::NonFiniteSignal(
                "filter output diverged".to_string(),
            ));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_hz: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / fs).sin())
            .collect()
    }

    fn rms(signal: &[f64]) -> f64 {
        (signal.iter().map(|v| v * v).sum::<f64>() / signal.len() as f64).sqrt()
    }

    fn default_filter() -> BandpassFilter {
        BandpassFilter::design(30.0, &BandpassConfig::default()).unwrap()
    }

    #[test]
    fn test_zero_in_zero_out() {
        let out = default_filter().filtfilt(&[0.0; 300]).unwrap();
        assert_eq!(out.len(), 300);
        assert!(out.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_center_frequency_passes_without_phase_shift() {
        let input = sine(1.5, 30.0, 300);
        let out = default_filter().filtfilt(&input).unwrap();

        for i in 100..200 {
            assert!(
                (out[i] - input[i]).abs() < 0.02,
                "sample {i}: {} vs {}",
                out[i],
                input[i]
            );
        }
    }

    #[test]
    fn test_out_of_band_attenuated() {
        let filter = default_filter();
        let pass = filter.filtfilt(&sine(1.5, 30.0, 300)).unwrap();
        let stop = filter.filtfilt(&sine(8.0, 30.0, 300)).unwrap();

        assert!(rms(&stop[50..250]) < 0.2 * rms(&pass[50..250]));
    }

    #[test]
    fn test_nan_input_rejected() {
        let mut input = sine(1.5, 30.0, 64);
        input[10] = f64::NAN;
        assert!(matches!(
            default_filter().filtfilt(&input),
            Err(ComputeError::NonFiniteSignal(_))
        ));
    }

    #[test]
    fn test_design_validation() {
        let bad_center = BandpassConfig {
            center_hz: 20.0,
            ..Default::default()
        };
        assert!(BandpassFilter::design(30.0, &bad_center).is_err());

        let bad_order = BandpassConfig {
            order: 0,
            ..Default::default()
        };
        assert!(BandpassFilter::design(30.0, &bad_order).is_err());

        assert!(BandpassFilter::design(0.0, &BandpassConfig::default()).is_err());
        assert_eq!(default_filter().order(), 2);
    }
}
