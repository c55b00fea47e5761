//! Approximate head pose from 2D face-mesh landmarks
//!
//! No 3D model fit. Each angle comes from one geometric cue:
//! - pitch: where the nose tip sits between forehead and chin, relative to a
//!   neutral ratio of 0.42, scaled by 120
//! - yaw: horizontal offset of the nose tip from the eye-corner midpoint,
//!   scaled by 400
//! - roll: angle of the line through the outer eye corners
//!
//! The scale factors are empirical and only meaningful for normalized
//! image coordinates.

use crate::types::{HeadPose, LandmarkFrame};

pub const NOSE_TIP: usize = 1;
pub const FOREHEAD: usize = 10;
pub const CHIN: usize = 152;
pub const LEFT_EYE_OUTER: usize = 33;
pub const RIGHT_EYE_OUTER: usize = 263;

const NEUTRAL_PITCH_RATIO: f64 = 0.42;
const PITCH_SCALE: f64 = 120.0;
const YAW_SCALE: f64 = 400.0;

/// Stateless pose estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadPoseEstimator;

impl HeadPoseEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Signed pitch, yaw and roll in degrees
    pub fn estimate(&self, frame: &LandmarkFrame) -> HeadPose {
        let nose = frame.point(NOSE_TIP);
        let chin = frame.point(CHIN);
        let forehead = frame.point(FOREHEAD);
        let left_eye = frame.point(LEFT_EYE_OUTER);
        let right_eye = frame.point(RIGHT_EYE_OUTER);

        let mut face_height = (chin.y - forehead.y).abs();
        if face_height == 0.0 {
            face_height = 1.0;
        }
        let pitch = ((chin.y - nose.y) / face_height - NEUTRAL_PITCH_RATIO) * PITCH_SCALE;

        let eye_mid_x = (left_eye.x + right_eye.x) / 2.0;
        let yaw = (nose.x - eye_mid_x) * YAW_SCALE;

        let roll = (right_eye.y - left_eye.y)
            .atan2(right_eye.x - left_eye.x)
            .to_degrees();

        HeadPose { pitch, yaw, roll }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Point2, FACE_MESH_LANDMARKS};

    fn face(nose: Point2, left_eye: Point2, right_eye: Point2) -> LandmarkFrame {
        let mut points = vec![Point2::new(0.5, 0.5); FACE_MESH_LANDMARKS];
        points[FOREHEAD] = Point2::new(0.5, 0.2);
        points[CHIN] = Point2::new(0.5, 0.8);
        points[NOSE_TIP] = nose;
        points[LEFT_EYE_OUTER] = left_eye;
        points[RIGHT_EYE_OUTER] = right_eye;
        LandmarkFrame::new(points).unwrap()
    }

    fn level_eyes() -> (Point2, Point2) {
        (Point2::new(0.4, 0.4), Point2::new(0.6, 0.4))
    }

    #[test]
    fn test_neutral_face() {
        let (le, re) = level_eyes();
        let pose = HeadPoseEstimator::new().estimate(&face(Point2::new(0.5, 0.548), le, re));

        assert!(pose.pitch.abs() < 1e-9);
        assert!(pose.yaw.abs() < 1e-9);
        assert!(pose.roll.abs() < 1e-9);
    }

    #[test]
    fn test_nose_closer_to_forehead_pitches_down() {
        let (le, re) = level_eyes();
        // (0.8 - 0.5) / 0.6 = 0.5, (0.5 - 0.42) * 120 = 9.6
        let pose = HeadPoseEstimator::new().estimate(&face(Point2::new(0.5, 0.5), le, re));
        assert!((pose.pitch - 9.6).abs() < 1e-9);
    }

    #[test]
    fn test_yaw_sign_follows_nose_offset() {
        let (le, re) = level_eyes();
        let estimator = HeadPoseEstimator::new();

        let right = estimator.estimate(&face(Point2::new(0.55, 0.548), le, re));
        let left = estimator.estimate(&face(Point2::new(0.45, 0.548), le, re));
        assert!((right.yaw - 20.0).abs() < 1e-9);
        assert!((left.yaw + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_roll_from_tilted_eye_line() {
        let pose = HeadPoseEstimator::new().estimate(&face(
            Point2::new(0.5, 0.548),
            Point2::new(0.4, 0.4),
            Point2::new(0.6, 0.6),
        ));
        assert!((pose.roll - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_face_height_does_not_divide_by_zero() {
        let mut points = vec![Point2::new(0.5, 0.5); FACE_MESH_LANDMARKS];
        points[NOSE_TIP] = Point2::new(0.5, 0.3);
        let frame = LandmarkFrame::new(points).unwrap();

        let pose = HeadPoseEstimator::new().estimate(&frame);
        // (0.5 - 0.3) / 1 = 0.2, (0.2 - 0.42) * 120 = -26.4
        assert!((pose.pitch + 26.4).abs() < 1e-9);
        assert!(pose.roll.is_finite());
    }
}
