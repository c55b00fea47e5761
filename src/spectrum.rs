//! Spectral peak extraction
//!
//! One routine serves three analyses: blink rate over the EAR window
//! (0.1-0.6 Hz), heart rate (1.0-3.5 Hz) and respiration (0.1-0.7 Hz) over
//! the reconstructed rPPG trace. The magnitude spectrum is taken with an FFT,
//! bin `k` sits at `k * fs / n`, and the loudest bin inside the inclusive band
//! wins (first one on ties).

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use crate::types::SpectralPeak;

/// Half-width of the EAR smoothing window (5-point moving average)
pub const SMOOTHING_RADIUS: usize = 2;

/// Inclusive frequency band in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub min_hz: f64,
    pub max_hz: f64,
}

impl FrequencyBand {
    pub const fn new(min_hz: f64, max_hz: f64) -> Self {
        Self { min_hz, max_hz }
    }

    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.min_hz && freq_hz <= self.max_hz
    }

    pub fn is_valid_for(&self, sample_rate_hz: f64) -> bool {
        self.min_hz.is_finite()
            && self.max_hz.is_finite()
            && self.min_hz >= 0.0
            && self.min_hz < self.max_hz
            && self.max_hz <= sample_rate_hz / 2.0
    }
}

/// Dominant-frequency finder for a fixed sampling rate
#[derive(Debug, Clone, Copy)]
pub struct SpectralPeakFinder {
    sample_rate_hz: f64,
}

impl SpectralPeakFinder {
    pub fn new(sample_rate_hz: f64) -> Self {
        Self { sample_rate_hz }
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    /// Loudest in-band bin of `signal`.
    ///
    /// Returns `None` when the signal is too short to transform or when no
    /// in-band bin has a positive amplitude.
    pub fn peak(&self, signal: &[f64], band: FrequencyBand) -> Option<SpectralPeak> {
        let n = signal.len();
        if n < 2 || self.sample_rate_hz <= 0.0 {
            return None;
        }

        let spectrum = magnitude_spectrum(signal);
        let bin_width = self.sample_rate_hz / n as f64;

        let mut best: Option<SpectralPeak> = None;
        for (k, &amplitude) in spectrum.iter().enumerate().skip(1) {
            let frequency = k as f64 * bin_width;
            if !band.contains(frequency) || amplitude <= 0.0 {
                continue;
            }
            if best.map_or(true, |b| amplitude > b.amplitude) {
                best = Some(SpectralPeak {
                    frequency,
                    amplitude,
                });
            }
        }
        best
    }

    /// Frequency of the in-band peak, or `0.0` when there is none
    pub fn peak_frequency(&self, signal: &[f64], band: FrequencyBand) -> f64 {
        self.peak(signal, band).map_or(0.0, |p| p.frequency)
    }

    /// Peak search for the EAR path: the window is mean-centered and smoothed
    /// with a 5-point moving average before the transform.
    pub fn smoothed_peak(&self, signal: &[f64], band: FrequencyBand) -> Option<SpectralPeak> {
        let prepared = smooth(&center(signal), SMOOTHING_RADIUS);
        self.peak(&prepared, band)
    }
}

/// Magnitudes of bins `0..=n/2`
fn magnitude_spectrum(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&s| Complex::new(s, 0.0)).collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    buffer.iter().take(n / 2 + 1).map(|c| c.norm()).collect()
}

/// Subtract the mean from every sample
pub fn center(signal: &[f64]) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let mean = signal.iter().sum::<f64>() / signal.len() as f64;
    signal.iter().map(|s| s - mean).collect()
}

/// Centered moving average of width `2 * radius + 1`.
///
/// Near the edges the window shrinks to whatever neighbors exist. Zero is a
/// real reading and is averaged like any other value.
pub fn smooth(signal: &[f64], radius: usize) -> Vec<f64> {
    let n = signal.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(n - 1);
            let window = &signal[lo..=hi];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq_hz: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_pure_sine_peak() {
        let finder = SpectralPeakFinder::new(30.0);
        let signal = sine(1.2, 30.0, 300);

        let peak = finder.peak(&signal, FrequencyBand::new(1.0, 3.5)).unwrap();
        assert!((peak.frequency - 1.2).abs() <= 0.1);
        assert!(peak.amplitude > 0.0);
    }

    #[test]
    fn test_off_bin_sine_within_one_bin() {
        let finder = SpectralPeakFinder::new(30.0);
        let signal = sine(1.73, 30.0, 300);

        let freq = finder.peak_frequency(&signal, FrequencyBand::new(1.0, 3.5));
        assert!((freq - 1.73).abs() <= 0.1, "got {freq}");
    }

    #[test]
    fn test_out_of_band_energy_ignored() {
        let finder = SpectralPeakFinder::new(30.0);
        let loud: Vec<f64> = sine(2.0, 30.0, 300)
            .iter()
            .zip(sine(0.3, 30.0, 300))
            .map(|(a, b)| 5.0 * a + b)
            .collect();

        let freq = finder.peak_frequency(&loud, FrequencyBand::new(0.1, 0.7));
        assert!((freq - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_silence_has_no_peak() {
        let finder = SpectralPeakFinder::new(30.0);
        let flat = vec![0.0; 300];

        assert!(finder.peak(&flat, FrequencyBand::new(1.0, 3.5)).is_none());
        assert_eq!(finder.peak_frequency(&flat, FrequencyBand::new(1.0, 3.5)), 0.0);
    }

    #[test]
    fn test_short_signal_has_no_peak() {
        let finder = SpectralPeakFinder::new(30.0);
        assert!(finder.peak(&[], FrequencyBand::new(0.1, 0.6)).is_none());
        assert!(finder.peak(&[1.0], FrequencyBand::new(0.1, 0.6)).is_none());
    }

    #[test]
    fn test_center_removes_mean() {
        let centered = center(&[1.0, 2.0, 3.0]);
        assert_eq!(centered, vec![-1.0, 0.0, 1.0]);
        assert!(center(&[]).is_empty());
    }

    #[test]
    fn test_smooth_partial_edges() {
        let smoothed = smooth(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2);

        // first sample averages itself and two right neighbors
        assert!((smoothed[0] - 2.0).abs() < 1e-12);
        assert!((smoothed[1] - 2.5).abs() < 1e-12);
        assert!((smoothed[2] - 3.0).abs() < 1e-12);
        assert!((smoothed[5] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_smooth_keeps_zero_readings() {
        // a zero neighbor still counts toward the average
        let smoothed = smooth(&[0.0, 0.0, 3.0, 0.0, 0.0], 2);
        assert!((smoothed[2] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_band_validation() {
        assert!(FrequencyBand::new(1.0, 3.5).is_valid_for(30.0));
        assert!(!FrequencyBand::new(3.5, 1.0).is_valid_for(30.0));
        assert!(!FrequencyBand::new(1.0, 20.0).is_valid_for(30.0));
    }
}
