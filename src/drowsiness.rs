//! Drowsiness scoring
//!
//! The score is homeostatic: it starts at 100, drops while risk factors stack
//! up and drifts back toward 100 when they clear. It is updated once per frame
//! after the EAR window first fills, and never reset within a process run.
//!
//! Risk factors and their penalty points:
//!
//! | Factor | Condition | Points |
//! |---|---|---|
//! | Blink rate | < 8/min | 3 |
//! | Blink rate | > 40/min | 1 |
//! | Closed-eye frames | > 60 in the window | 2 |
//! | Head down | pitch > 15° for ≥ 90 frames | 2 |
//! | Head scanning | yaw std > 12° and > 20 yaw jumps of 10° | 1 |
//! | Pitch | \|pitch\| > 25° | 1 |
//! | Roll | \|roll\| > 20° | 1 |
//!
//! Penalty ≥ 5 moves the score by -3, ≥ 3 by -1, anything less by +1.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DrowsinessConfig;
use crate::ear::EyeAspectRatioTracker;
use crate::head_pose::HeadPoseEstimator;
use crate::types::{DrowsinessComment, DrowsinessSnapshot, HeadPose, LandmarkFrame};
use crate::window::RollingWindow;

pub const LOW_BLINK_RATE: u32 = 8;
pub const HIGH_BLINK_RATE: u32 = 40;
pub const MAX_CLOSED_FRAMES: usize = 60;
/// Pitch (degrees) above which a frame counts as head-down
pub const HEAD_DOWN_PITCH: f64 = 15.0;
/// Consecutive head-down frames that count as sustained (3 s at 30 fps)
pub const SUSTAINED_HEAD_DOWN_FRAMES: u32 = 90;
pub const YAW_STD_LIMIT: f64 = 12.0;
pub const YAW_CHANGE_LIMIT: usize = 20;
/// Frame-to-frame yaw difference counted as a head turn
pub const YAW_JUMP_DEGREES: f64 = 10.0;
pub const PITCH_LIMIT: f64 = 25.0;
pub const ROLL_LIMIT: f64 = 20.0;

/// Bounded drowsiness score, 100 = fully alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i64")]
pub struct DrowsinessScore(u8);

impl DrowsinessScore {
    pub const MAX: u8 = 100;

    /// Clamp any value into `0..=100`
    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, Self::MAX as i64) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Apply a delta, saturating at both ends
    pub fn apply(self, delta: i32) -> Self {
        Self::new(self.0 as i64 + delta as i64)
    }

    pub fn comment(&self) -> DrowsinessComment {
        DrowsinessComment::from_score(self.0)
    }
}

impl From<i64> for DrowsinessScore {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl Default for DrowsinessScore {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

/// Inputs to one scoring step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RiskFactors {
    pub blink_per_min: u32,
    pub closed_frames: usize,
    pub head_down_frames: u32,
    /// Standard deviation of the yaw window around its mean (degrees).
    /// Not the RMS distance from the current yaw.
    pub yaw_std: f64,
    /// Yaw jumps above 10° in the yaw window
    pub yaw_changes: usize,
    /// Signed pitch of the current frame (degrees)
    pub pitch: f64,
    /// Signed roll of the current frame (degrees)
    pub roll: f64,
}

impl RiskFactors {
    /// Sum of the penalty points of every active factor
    pub fn penalty(&self) -> u32 {
        let mut penalty = 0;

        if self.blink_per_min < LOW_BLINK_RATE {
            penalty += 3;
        } else if self.blink_per_min > HIGH_BLINK_RATE {
            penalty += 1;
        }
        if self.closed_frames > MAX_CLOSED_FRAMES {
            penalty += 2;
        }
        if self.head_down_frames >= SUSTAINED_HEAD_DOWN_FRAMES {
            penalty += 2;
        }
        if self.yaw_std > YAW_STD_LIMIT && self.yaw_changes > YAW_CHANGE_LIMIT {
            penalty += 1;
        }
        if self.pitch.abs() > PITCH_LIMIT {
            penalty += 1;
        }
        if self.roll.abs() > ROLL_LIMIT {
            penalty += 1;
        }
        penalty
    }
}

/// Score change for a penalty total
pub fn score_delta(penalty: u32) -> i32 {
    match penalty {
        p if p >= 5 => -3,
        p if p >= 3 => -1,
        _ => 1,
    }
}

/// Persistent score plus the sustained head-down counter
#[derive(Debug, Clone, Default)]
pub struct DrowsinessScorer {
    score: DrowsinessScore,
    head_down_frames: u32,
}

impl DrowsinessScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the head-down counter with this frame's signed pitch.
    ///
    /// The counter resets the moment pitch drops to the threshold or below.
    pub fn observe_pitch(&mut self, pitch: f64) -> u32 {
        self.head_down_frames = if pitch > HEAD_DOWN_PITCH {
            self.head_down_frames.saturating_add(1)
        } else {
            0
        };
        self.head_down_frames
    }

    pub fn head_down_frames(&self) -> u32 {
        self.head_down_frames
    }

    pub fn score(&self) -> DrowsinessScore {
        self.score
    }

    /// Score one step and return the applied delta
    pub fn update(&mut self, factors: &RiskFactors) -> i32 {
        let delta = score_delta(factors.penalty());
        self.score = self.score.apply(delta);
        delta
    }
}

/// Per-frame drowsiness analysis: EAR tracking, head pose and scoring
#[derive(Debug, Clone)]
pub struct DrowsinessAnalyzer {
    ear: EyeAspectRatioTracker,
    pose: HeadPoseEstimator,
    yaw: RollingWindow<f64>,
    /// Not scored; kept for consumers through `pitch_window`
    pitch: RollingWindow<f64>,
    scorer: DrowsinessScorer,
    blink_per_min: u32,
}

impl DrowsinessAnalyzer {
    pub fn new(config: &DrowsinessConfig) -> Self {
        Self {
            ear: EyeAspectRatioTracker::new(config),
            pose: HeadPoseEstimator::new(),
            yaw: RollingWindow::new(config.pose_window_frames),
            pitch: RollingWindow::new(config.pose_window_frames),
            scorer: DrowsinessScorer::new(),
            blink_per_min: 0,
        }
    }

    /// Analyze one detected face.
    ///
    /// Frames with no face must not reach this method; skipping them leaves
    /// every window and the score untouched.
    pub fn on_frame(&mut self, frame: &LandmarkFrame) -> DrowsinessSnapshot {
        let ear = self.ear.observe(frame);
        let pose = self.pose.estimate(frame);

        self.pitch.push(pose.pitch);
        self.yaw.push(pose.yaw);
        let head_down_frames = self.scorer.observe_pitch(pose.pitch);

        if self.ear.is_ready() {
            self.score_window(&pose, head_down_frames);
        }

        self.snapshot(ear, &pose)
    }

    fn score_window(&mut self, pose: &HeadPose, head_down_frames: u32) {
        self.blink_per_min = self.ear.blink_per_min();

        let factors = RiskFactors {
            blink_per_min: self.blink_per_min,
            closed_frames: self.ear.closed_frames(),
            head_down_frames,
            yaw_std: self.yaw.std_dev().unwrap_or(0.0),
            yaw_changes: self.yaw.count_jumps(YAW_JUMP_DEGREES),
            pitch: pose.pitch,
            roll: pose.roll,
        };

        let before = self.scorer.score();
        let delta = self.scorer.update(&factors);
        let after = self.scorer.score();

        if before != after {
            debug!(
                score = after.value(),
                delta,
                penalty = factors.penalty(),
                "drowsiness score changed"
            );
        }
        if before.comment() != after.comment() {
            info!(
                from = before.comment().as_str(),
                to = after.comment().as_str(),
                score = after.value(),
                "drowsiness level changed"
            );
        }
    }

    fn snapshot(&self, ear: f64, pose: &HeadPose) -> DrowsinessSnapshot {
        let score = self.scorer.score();
        DrowsinessSnapshot {
            ear,
            blink_per_min: self.blink_per_min,
            score: score.value(),
            pitch: pose.pitch.abs(),
            yaw: pose.yaw.abs(),
            roll: pose.roll.abs(),
            comment: score.comment(),
        }
    }

    pub fn score(&self) -> DrowsinessScore {
        self.scorer.score()
    }

    pub fn head_down_frames(&self) -> u32 {
        self.scorer.head_down_frames()
    }

    pub fn ear_window(&self) -> &RollingWindow<f64> {
        self.ear.window()
    }

    pub fn pitch_window(&self) -> &RollingWindow<f64> {
        &self.pitch
    }

    pub fn yaw_window(&self) -> &RollingWindow<f64> {
        &self.yaw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ear::tests::face_with_ear;
    use pretty_assertions::assert_eq;

    fn alert() -> RiskFactors {
        RiskFactors {
            blink_per_min: 15,
            ..Default::default()
        }
    }

    #[test]
    fn test_score_clamps() {
        assert_eq!(DrowsinessScore::default().value(), 100);
        assert_eq!(DrowsinessScore::default().apply(1).value(), 100);
        assert_eq!(DrowsinessScore::new(2).apply(-3).value(), 0);
        assert_eq!(DrowsinessScore::new(500).value(), 100);
        assert_eq!(DrowsinessScore::new(-7).value(), 0);
    }

    #[test]
    fn test_deserialized_score_is_clamped() {
        let high: DrowsinessScore = serde_json::from_str("250").unwrap();
        assert_eq!(high.value(), 100);
        let low: DrowsinessScore = serde_json::from_str("-4").unwrap();
        assert_eq!(low.value(), 0);

        let json = serde_json::to_string(&DrowsinessScore::new(42)).unwrap();
        assert_eq!(json, "42");
        assert_eq!(serde_json::from_str::<DrowsinessScore>(&json).unwrap().value(), 42);
    }

    #[test]
    fn test_penalty_table() {
        assert_eq!(alert().penalty(), 0);

        let slow_blinks = RiskFactors {
            blink_per_min: 6,
            ..alert()
        };
        assert_eq!(slow_blinks.penalty(), 3);

        let fast_blinks = RiskFactors {
            blink_per_min: 42,
            ..alert()
        };
        assert_eq!(fast_blinks.penalty(), 1);

        let everything = RiskFactors {
            blink_per_min: 0,
            closed_frames: 61,
            head_down_frames: 90,
            yaw_std: 12.5,
            yaw_changes: 21,
            pitch: -26.0,
            roll: 21.0,
        };
        assert_eq!(everything.penalty(), 3 + 2 + 2 + 1 + 1 + 1);
    }

    #[test]
    fn test_yaw_needs_both_conditions() {
        let spread_only = RiskFactors {
            yaw_std: 30.0,
            yaw_changes: 5,
            ..alert()
        };
        assert_eq!(spread_only.penalty(), 0);
    }

    #[test]
    fn test_score_delta_bands() {
        assert_eq!(score_delta(0), 1);
        assert_eq!(score_delta(2), 1);
        assert_eq!(score_delta(3), -1);
        assert_eq!(score_delta(4), -1);
        assert_eq!(score_delta(5), -3);
        assert_eq!(score_delta(10), -3);
    }

    #[test]
    fn test_head_down_counter_resets() {
        let mut scorer = DrowsinessScorer::new();
        for _ in 0..5 {
            scorer.observe_pitch(20.0);
        }
        assert_eq!(scorer.head_down_frames(), 5);

        scorer.observe_pitch(15.0);
        assert_eq!(scorer.head_down_frames(), 0);
    }

    #[test]
    fn test_scorer_drifts_back_up() {
        let mut scorer = DrowsinessScorer::new();
        let drowsy = RiskFactors {
            blink_per_min: 0,
            closed_frames: 100,
            ..Default::default()
        };
        for _ in 0..10 {
            scorer.update(&drowsy);
        }
        assert_eq!(scorer.score().value(), 70);

        for _ in 0..5 {
            scorer.update(&alert());
        }
        assert_eq!(scorer.score().value(), 75);
        assert_eq!(scorer.score().comment(), DrowsinessComment::Caution);
    }

    #[test]
    fn test_analyzer_waits_for_full_window() {
        let mut analyzer = DrowsinessAnalyzer::new(&DrowsinessConfig::default());
        let closed = face_with_ear(0.05);

        for _ in 0..299 {
            let snapshot = analyzer.on_frame(&closed);
            assert_eq!(snapshot.score, 100);
            assert_eq!(snapshot.blink_per_min, 0);
        }
        assert_eq!(analyzer.ear_window().len(), 299);
        assert_eq!(analyzer.yaw_window().len(), 150);
        assert_eq!(analyzer.pitch_window().len(), 150);
        assert!(analyzer.pitch_window().latest().unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_long_closure_costs_three_points() {
        let mut analyzer = DrowsinessAnalyzer::new(&DrowsinessConfig::default());
        let open = face_with_ear(0.3);
        let closed = face_with_ear(0.1);

        let mut last = None;
        for i in 0..300 {
            last = Some(analyzer.on_frame(if i < 70 { &closed } else { &open }));
        }
        let snapshot = last.unwrap();

        // 6 blinks/min (+3) and 70 closed frames (+2)
        assert_eq!(snapshot.blink_per_min, 6);
        assert_eq!(snapshot.score, 97);
        assert_eq!(snapshot.comment, DrowsinessComment::Normal);
        assert!((snapshot.ear - 0.3).abs() < 1e-9);
        assert!(snapshot.pitch < 1e-9);
    }

    #[test]
    fn test_snapshot_reports_absolute_angles() {
        let mut analyzer = DrowsinessAnalyzer::new(&DrowsinessConfig::default());
        let mut points = face_with_ear(0.3).points().to_vec();
        // nose left of the eye midpoint
        points[1].x = 0.45;
        let frame = LandmarkFrame::new(points).unwrap();

        let snapshot = analyzer.on_frame(&frame);
        assert!((snapshot.yaw - 20.0).abs() < 1e-9);
        assert!(*analyzer.yaw_window().latest().unwrap() < 0.0);
    }
}
