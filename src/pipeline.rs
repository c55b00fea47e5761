//! Recording replay
//!
//! Drives a fresh [`FaceMonitor`] with a recorded pulsecam.frame_event.v1
//! stream. Timestamps stand in for the wall clock: before each event the
//! session timer is polled, so a session closes at the first event at or
//! after its deadline, exactly as a live capture tick would close it.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::encoder::{MonitorReport, SnapshotEncoder};
use crate::error::ComputeError;
use crate::schema::{FrameEvent, FrameEventAdapter, MonitorInput, TimedInput};
use crate::session::{FaceMonitor, FrameOutcome, TickOutcome};
use crate::types::{DrowsinessSnapshot, SessionReport};

/// A session the replay closed successfully
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayedSession {
    /// Recording time at which the session closed
    pub closed_at_ms: u64,
    pub report: SessionReport,
    /// Drowsiness state at that moment
    pub drowsiness: Option<DrowsinessSnapshot>,
}

/// A session or command the replay could not complete
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayFailure {
    pub t_ms: u64,
    pub insufficient_data: bool,
    pub error: String,
}

/// Everything a replay produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub sessions: Vec<ReplayedSession>,
    pub failures: Vec<ReplayFailure>,
    pub last_drowsiness: Option<DrowsinessSnapshot>,
    pub drowsiness_score: u8,
    pub frames_analyzed: usize,
    pub frames_skipped: usize,
    pub ticks_appended: usize,
    pub ticks_not_ready: usize,
    pub ticks_ignored: usize,
    /// The recording ended before the running session's timer
    pub ended_mid_session: bool,
}

impl ReplaySummary {
    /// One report per closed session, then the final drowsiness state
    pub fn to_reports(&self, encoder: &SnapshotEncoder) -> Vec<MonitorReport> {
        let mut reports: Vec<MonitorReport> = self
            .sessions
            .iter()
            .map(|s| encoder.encode(Some(&s.report), s.drowsiness.as_ref()))
            .collect();
        if let Some(drowsiness) = &self.last_drowsiness {
            reports.push(encoder.encode_drowsiness(drowsiness));
        }
        reports
    }
}

/// Replay a parsed recording.
///
/// # Arguments
/// * `events` - Recorded events in timestamp order
/// * `config` - Monitor configuration
///
/// # Returns
/// The collected session reports, failures and final drowsiness state.
/// Invalid events or configuration abort the replay; failed sessions do not.
///
/// # Example
/// ```ignore
/// let events = FrameEventAdapter::parse_ndjson(&recording)?;
/// let summary = replay(&events, &MonitorConfig::default())?;
/// ```
pub fn replay(events: &[FrameEvent], config: &MonitorConfig) -> Result<ReplaySummary, ComputeError> {
    let inputs = FrameEventAdapter::to_inputs(events)?;
    replay_inputs(inputs, config)
}

/// Parse an NDJSON or JSON-array recording and replay it
pub fn replay_str(recording: &str, config: &MonitorConfig) -> Result<ReplaySummary, ComputeError> {
    let events = FrameEventAdapter::parse(recording)?;
    replay(&events, config)
}

/// Replay already converted inputs
pub fn replay_inputs(
    inputs: Vec<TimedInput>,
    config: &MonitorConfig,
) -> Result<ReplaySummary, ComputeError> {
    let mut monitor = FaceMonitor::new(config.clone())?;
    let mut summary = ReplaySummary::default();

    for TimedInput { t_ms, input } in inputs {
        close_if_due(&mut monitor, t_ms, &mut summary);

        match input {
            MonitorInput::StartSession => {
                if let Err(e) = monitor.start_session(t_ms) {
                    warn!(t_ms, error = %e, "start event rejected");
                    summary.failures.push(failure(t_ms, &e));
                }
            }
            MonitorInput::StopSession => {
                if !monitor.stop_session() {
                    debug!(t_ms, "stop event without a running session");
                }
            }
            MonitorInput::Frame(detection) => match monitor.on_frame(detection) {
                FrameOutcome::Analyzed(_) => summary.frames_analyzed += 1,
                FrameOutcome::Skipped => summary.frames_skipped += 1,
            },
            MonitorInput::Inference(result) => match monitor.on_inference(result) {
                TickOutcome::Appended { .. } => summary.ticks_appended += 1,
                TickOutcome::ModelNotReady => summary.ticks_not_ready += 1,
                TickOutcome::Ignored => summary.ticks_ignored += 1,
            },
        }
    }

    summary.ended_mid_session = monitor.is_session_active();
    summary.last_drowsiness = monitor.last_drowsiness();
    summary.drowsiness_score = monitor.drowsiness_score().value();

    info!(
        sessions = summary.sessions.len(),
        failures = summary.failures.len(),
        frames = summary.frames_analyzed,
        score = summary.drowsiness_score,
        "replay finished"
    );
    Ok(summary)
}

fn close_if_due(monitor: &mut FaceMonitor, t_ms: u64, summary: &mut ReplaySummary) {
    match monitor.poll(t_ms) {
        Some(Ok(report)) => summary.sessions.push(ReplayedSession {
            closed_at_ms: t_ms,
            report,
            drowsiness: monitor.last_drowsiness(),
        }),
        Some(Err(e)) => summary.failures.push(failure(t_ms, &e)),
        None => {}
    }
}

fn failure(t_ms: u64, error: &ComputeError) -> ReplayFailure {
    ReplayFailure {
        t_ms,
        insufficient_data: error.is_insufficient_data(),
        error: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::f64::consts::PI;

    fn face_landmarks() -> Vec<[f64; 2]> {
        crate::ear::tests::face_with_ear(0.3)
            .points()
            .iter()
            .map(|p| [p.x, p.y])
            .collect()
    }

    /// 10 s of 30 fps capture with one 30-sample batch per second
    fn recording(with_faces: bool, with_values: bool) -> Vec<FrameEvent> {
        let wave: Vec<f64> = (0..=300)
            .map(|i| (2.0 * PI * 1.2 * i as f64 / 30.0).sin())
            .collect();
        let increments: Vec<f64> = wave.windows(2).map(|w| w[1] - w[0]).collect();
        let landmarks = face_landmarks();

        let mut events = vec![FrameEvent::start(0)];
        for i in 0..300u64 {
            let t = i * 33;
            events.push(if with_faces {
                FrameEvent::face(t, landmarks.clone())
            } else {
                FrameEvent::no_face(t)
            });
            if with_values && i % 30 == 29 {
                let start = (i - 29) as usize;
                events.push(FrameEvent::inference(t, increments[start..start + 30].to_vec()));
            }
        }
        events.push(FrameEvent::no_face(10_000));
        events
    }

    #[test]
    fn test_replay_closes_session_on_timer() {
        let summary = replay(&recording(true, true), &MonitorConfig::default()).unwrap();

        assert_eq!(summary.sessions.len(), 1);
        let session = &summary.sessions[0];
        assert_eq!(session.closed_at_ms, 10_000);
        assert_eq!(session.report.samples, 300);
        assert!((session.report.vitals.heart_rate as i64 - 72).abs() <= 7);
        assert!(session.drowsiness.is_some());

        assert_eq!(summary.frames_analyzed, 300);
        assert_eq!(summary.frames_skipped, 1);
        assert_eq!(summary.ticks_appended, 10);
        assert!(!summary.ended_mid_session);
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn test_replay_without_faces_or_values() {
        let summary = replay(&recording(false, false), &MonitorConfig::default()).unwrap();

        assert!(summary.sessions.is_empty());
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].insufficient_data);
        assert_eq!(summary.drowsiness_score, 100);
        assert!(summary.last_drowsiness.is_none());
        assert_eq!(summary.frames_skipped, 301);
    }

    #[test]
    fn test_stop_discards_session() {
        let events = vec![
            FrameEvent::start(0),
            FrameEvent::inference(10, vec![0.1; 30]),
            FrameEvent::stop(20),
            FrameEvent::inference(30, vec![0.1; 30]),
            FrameEvent::no_face(20_000),
        ];
        let summary = replay(&events, &MonitorConfig::default()).unwrap();

        assert!(summary.sessions.is_empty());
        assert!(summary.failures.is_empty());
        assert_eq!(summary.ticks_appended, 1);
        assert_eq!(summary.ticks_ignored, 1);
    }

    #[test]
    fn test_double_start_is_a_failure_not_an_abort() {
        let events = vec![FrameEvent::start(0), FrameEvent::start(5)];
        let summary = replay(&events, &MonitorConfig::default()).unwrap();

        assert_eq!(summary.failures.len(), 1);
        assert!(!summary.failures[0].insufficient_data);
        assert!(summary.ended_mid_session);
    }

    #[test]
    fn test_reports_follow_sessions() {
        let summary = replay(&recording(true, true), &MonitorConfig::default()).unwrap();
        let reports = summary.to_reports(&SnapshotEncoder::new());

        assert_eq!(reports.len(), 2);
        assert!(reports[0].vitals.is_some());
        assert!(reports[1].vitals.is_none());
        assert!(reports[1].drowsiness.is_some());
    }

    #[test]
    fn test_replay_str_accepts_ndjson() {
        let ndjson = "{\"t_ms\":0,\"kind\":\"start\"}\n{\"t_ms\":10000,\"kind\":\"frame\"}\n";
        let summary = replay_str(ndjson, &MonitorConfig::default()).unwrap();
        assert_eq!(summary.failures.len(), 1);
    }
}
