//! Pulse waveform reconstruction
//!
//! The inference model emits per-frame increments, not the waveform. At the
//! end of a session the whole raw buffer is integrated (running sum), passed
//! through the zero-phase band-pass filter, and the tail is trimmed because
//! the backward pass starts from rest there.

use tracing::debug;

use crate::config::VitalsConfig;
use crate::error::ComputeError;
use crate::filter::BandpassFilter;

/// Filtered pulse trace ready for spectral analysis and display
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedSignal {
    /// Trimmed zero-phase output
    pub filtered: Vec<f64>,
    /// Samples removed from the tail
    pub trimmed: usize,
}

/// Turns a session's raw increments into a filtered pulse trace
#[derive(Debug, Clone)]
pub struct SignalReconstructor {
    filter: BandpassFilter,
    edge_trim: usize,
}

impl SignalReconstructor {
    pub fn new(config: &VitalsConfig) -> Result<Self, ComputeError> {
        Ok(Self {
            filter: BandpassFilter::design(config.sample_rate_hz, &config.filter)?,
            edge_trim: config.edge_trim_samples,
        })
    }

    /// Integrate, filter and trim the full increment sequence.
    ///
    /// Needs more than `edge_trim` increments so something survives the trim.
    pub fn reconstruct(&self, increments: &[f64]) -> Result<ReconstructedSignal, ComputeError> {
        if increments.len() <= self.edge_trim {
            return Err(ComputeError::InsufficientData {
                required: self.edge_trim + 1,
                available: increments.len(),
            });
        }

        let integrated = cumulative_sum(increments);
        let mut filtered = self.filter.filtfilt(&integrated)?;
        filtered.truncate(filtered.len() - self.edge_trim);

        debug!(
            samples = increments.len(),
            kept = filtered.len(),
            "reconstructed pulse trace"
        );

        Ok(ReconstructedSignal {
            filtered,
            trimmed: self.edge_trim,
        })
    }
}

/// Running sum: `out[i] = in[0] + ... + in[i]`
pub fn cumulative_sum(increments: &[f64]) -> Vec<f64> {
    increments
        .iter()
        .scan(0.0, |acc, &x| {
            *acc += x;
            Some(*acc)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::f64::consts::PI;

    fn reconstructor() -> SignalReconstructor {
        SignalReconstructor::new(&VitalsConfig::default()).unwrap()
    }

    #[test]
    fn test_cumulative_sum() {
        assert_eq!(cumulative_sum(&[1.0, -2.0, 3.0, 0.5]), vec![1.0, -1.0, 2.0, 2.5]);
        assert!(cumulative_sum(&[]).is_empty());
    }

    #[test]
    fn test_zero_increments_reconstruct_to_zero() {
        let signal = reconstructor().reconstruct(&[0.0; 300]).unwrap();

        assert_eq!(signal.filtered.len(), 270);
        assert_eq!(signal.trimmed, 30);
        assert!(signal.filtered.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_increments_of_a_pulse_recover_the_pulse() {
        // increments whose running sum is a 1.5 Hz sinusoid
        let wave: Vec<f64> = (0..=300)
            .map(|i| (2.0 * PI * 1.5 * i as f64 / 30.0).sin())
            .collect();
        let increments: Vec<f64> = wave.windows(2).map(|w| w[1] - w[0]).collect();

        let signal = reconstructor().reconstruct(&increments).unwrap();
        for i in 100..200 {
            let expected = wave[i + 1] - wave[0];
            assert!((signal.filtered[i] - expected).abs() < 0.05);
        }
    }

    #[test]
    fn test_too_short_for_trim() {
        let result = reconstructor().reconstruct(&[0.1; 30]);
        assert!(matches!(
            result,
            Err(ComputeError::InsufficientData {
                required: 31,
                available: 30
            })
        ));
    }

    #[test]
    fn test_non_finite_increment_fails() {
        let mut increments = vec![0.01; 120];
        increments[40] = f64::INFINITY;
        assert!(matches!(
            reconstructor().reconstruct(&increments),
            Err(ComputeError::NonFiniteSignal(_))
        ));
    }
}
