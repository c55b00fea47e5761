//! Eye aspect ratio tracking
//!
//! Six face-mesh landmarks per eye: two corners (`p0`, `p3`), two upper lid
//! points (`p1`, `p2`) and two lower lid points (`p5`, `p4`).
//!
//! ```text
//! EAR = ((|p1 - p5| + |p2 - p4|) / 2) / |p0 - p3|     (0 when |p0 - p3| = 0)
//! ```
//!
//! The tracker keeps the per-frame average of both eyes in a rolling window
//! and derives the blink rate and the closed-eye frame count from it.

use crate::config::DrowsinessConfig;
use crate::spectrum::{FrequencyBand, SpectralPeakFinder};
use crate::types::LandmarkFrame;
use crate::window::RollingWindow;

/// Left eye: outer corner, upper lid x2, inner corner, lower lid x2
pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];

/// Right eye in the same order as [`LEFT_EYE`]
pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];

/// EAR of one eye
pub fn eye_aspect_ratio(frame: &LandmarkFrame, eye: &[usize; 6]) -> f64 {
    let p = eye.map(|i| frame.point(i));

    let horizontal = p[0].distance(&p[3]);
    if horizontal == 0.0 {
        return 0.0;
    }
    let vertical = (p[1].distance(&p[5]) + p[2].distance(&p[4])) / 2.0;
    vertical / horizontal
}

/// Average EAR of both eyes
pub fn frame_ear(frame: &LandmarkFrame) -> f64 {
    (eye_aspect_ratio(frame, &LEFT_EYE) + eye_aspect_ratio(frame, &RIGHT_EYE)) / 2.0
}

/// Rolling EAR history with blink and eye-closure statistics
#[derive(Debug, Clone)]
pub struct EyeAspectRatioTracker {
    window: RollingWindow<f64>,
    finder: SpectralPeakFinder,
    blink_band: FrequencyBand,
    closed_threshold: f64,
}

impl EyeAspectRatioTracker {
    pub fn new(config: &DrowsinessConfig) -> Self {
        Self {
            window: RollingWindow::new(config.ear_window_frames()),
            finder: SpectralPeakFinder::new(config.fps),
            blink_band: config.blink_band,
            closed_threshold: config.closed_ear_threshold,
        }
    }

    /// Compute this frame's EAR and push it into the window
    pub fn observe(&mut self, frame: &LandmarkFrame) -> f64 {
        let ear = frame_ear(frame);
        self.window.push(ear);
        ear
    }

    /// True once the window holds a full analysis span
    pub fn is_ready(&self) -> bool {
        self.window.is_full()
    }

    /// Blinks per minute from the dominant EAR oscillation.
    ///
    /// The peak frequency is mapped as `round(f * 10) * 6`: blinks in a 10 s
    /// window, scaled to a minute. Returns 0 when the band holds no energy.
    pub fn blink_per_min(&self) -> u32 {
        let ears = self.window.to_vec();
        let freq = self
            .finder
            .smoothed_peak(&ears, self.blink_band)
            .map_or(0.0, |p| p.frequency);
        (freq * 10.0).round() as u32 * 6
    }

    /// Frames in the window with EAR below the closed-eye threshold
    pub fn closed_frames(&self) -> usize {
        self.window
            .iter()
            .filter(|&&ear| ear < self.closed_threshold)
            .count()
    }

    pub fn window(&self) -> &RollingWindow<f64> {
        &self.window
    }
}
