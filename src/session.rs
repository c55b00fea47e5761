//! Monitoring sessions
//!
//! [`FaceMonitor`] owns all state for one monitoring run: the drowsiness
//! analyzer (process lifetime, never reset) and at most one timed rPPG
//! session. Two drivers feed it:
//! - the per-frame detection loop calls [`FaceMonitor::on_frame`]
//! - the capture/inference tick calls [`FaceMonitor::on_inference`] and
//!   [`FaceMonitor::poll`]
//!
//! Cancellation is a single session-active flag shared with the caller's
//! [`SessionHandle`]. Every tick handler checks it first, so a tick that
//! arrives after stop is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::MonitorConfig;
use crate::drowsiness::{DrowsinessAnalyzer, DrowsinessScore};
use crate::error::ComputeError;
use crate::types::{Detection, DrowsinessSnapshot, InferenceResult, SessionReport, VitalsSnapshot};
use crate::vitals::{RawSignalBuffer, VitalsEstimator};

/// What happened to one landmark frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Analyzed(DrowsinessSnapshot),
    /// No face in this frame; nothing was touched
    Skipped,
}

/// What happened to one inference tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Appended { accepted: usize, total: usize },
    ModelNotReady,
    /// No session is running, or it was cancelled
    Ignored,
}

/// Caller-side view of a running rPPG session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: String,
    active: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop accepting ticks. Returns false if the session had already ended.
    pub fn cancel(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }
}

/// One timed rPPG capture run
#[derive(Debug)]
pub struct RppgSession {
    id: String,
    started_at_ms: u64,
    deadline_ms: u64,
    buffer: RawSignalBuffer,
    active: Arc<AtomicBool>,
}

impl RppgSession {
    fn new(started_at_ms: u64, duration_ms: u64, capacity: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at_ms,
            deadline_ms: started_at_ms.saturating_add(duration_ms),
            buffer: RawSignalBuffer::new(capacity),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    pub fn deadline_ms(&self) -> u64 {
        self.deadline_ms
    }

    pub fn buffer(&self) -> &RawSignalBuffer {
        &self.buffer
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn handle(&self) -> SessionHandle {
        SessionHandle {
            session_id: self.id.clone(),
            active: Arc::clone(&self.active),
        }
    }
}

/// Stateful monitor for one face-camera run.
///
/// # Example
/// ```ignore
/// let mut monitor = FaceMonitor::new(MonitorConfig::default())?;
/// let handle = monitor.start_session(now_ms)?;
/// monitor.on_inference(InferenceResult::Values(batch));
/// if let Some(result) = monitor.poll(now_ms) {
///     let report = result?;
/// }
/// ```
pub struct FaceMonitor {
    config: MonitorConfig,
    drowsiness: DrowsinessAnalyzer,
    estimator: VitalsEstimator,
    session: Option<RppgSession>,
    latest_vitals: Option<VitalsSnapshot>,
    last_drowsiness: Option<DrowsinessSnapshot>,
}

impl FaceMonitor {
    /// Validate the configuration and build an idle monitor
    pub fn new(config: MonitorConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            drowsiness: DrowsinessAnalyzer::new(&config.drowsiness),
            estimator: VitalsEstimator::new(&config.vitals)?,
            config,
            session: None,
            latest_vitals: None,
            last_drowsiness: None,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Feed one detector result into the drowsiness path
    pub fn on_frame(&mut self, detection: Detection) -> FrameOutcome {
        match detection {
            Detection::Detected(frame) => {
                let snapshot = self.drowsiness.on_frame(&frame);
                self.last_drowsiness = Some(snapshot);
                FrameOutcome::Analyzed(snapshot)
            }
            Detection::NotDetected => FrameOutcome::Skipped,
        }
    }

    /// Begin a timed rPPG session.
    ///
    /// Fails with [`ComputeError::SessionActive`] while another session is
    /// still accepting ticks. A session cancelled through its handle is
    /// discarded here.
    pub fn start_session(&mut self, now_ms: u64) -> Result<SessionHandle, ComputeError> {
        if let Some(session) = &self.session {
            if session.is_active() {
                return Err(ComputeError::SessionActive);
            }
            debug!(session_id = %session.id, "discarding cancelled session");
        }

        let session = RppgSession::new(
            now_ms,
            self.config.vitals.session_duration_ms(),
            self.config.vitals.session_capacity(),
        );
        info!(
            session_id = %session.id,
            started_at_ms = now_ms,
            deadline_ms = session.deadline_ms,
            "rPPG session started"
        );

        let handle = session.handle();
        self.session = Some(session);
        Ok(handle)
    }

    /// Feed one inference result into the running session
    pub fn on_inference(&mut self, result: InferenceResult) -> TickOutcome {
        let Some(session) = self.session.as_mut().filter(|s| s.is_active()) else {
            debug!("inference tick without an active session");
            return TickOutcome::Ignored;
        };

        match result {
            InferenceResult::Values(values) => {
                let accepted = session.buffer.append(&values);
                TickOutcome::Appended {
                    accepted,
                    total: session.buffer.len(),
                }
            }
            InferenceResult::ModelNotReady => {
                debug!(session_id = %session.id, "model not ready, tick skipped");
                TickOutcome::ModelNotReady
            }
        }
    }

    /// Close the session once its timer has elapsed.
    ///
    /// Returns `None` while the session is still running or when there is
    /// nothing to close.
    pub fn poll(&mut self, now_ms: u64) -> Option<Result<SessionReport, ComputeError>> {
        let session = self.session.as_ref()?;
        if !session.is_active() {
            debug!(session_id = %session.id, "dropping cancelled session");
            self.session = None;
            return None;
        }
        if now_ms < session.deadline_ms {
            return None;
        }
        Some(self.finish_session())
    }

    /// End the running session now and analyze what it collected.
    ///
    /// The session is closed before the analysis runs. On failure the
    /// previous vitals stay in place.
    pub fn finish_session(&mut self) -> Result<SessionReport, ComputeError> {
        let session = match self.session.take() {
            Some(session) if session.is_active() => session,
            _ => return Err(ComputeError::NoActiveSession),
        };
        session.active.store(false, Ordering::Release);

        let samples = session.buffer.len();
        let result = self.estimator.estimate(session.buffer.as_slice());
        let (vitals, signal) = match result {
            Ok(estimate) => estimate,
            Err(e) => {
                warn!(session_id = %session.id, samples, error = %e, "session analysis failed");
                return Err(e);
            }
        };

        info!(
            session_id = %session.id,
            samples,
            dropped = session.buffer.dropped(),
            heart_rate = vitals.heart_rate,
            respiration_rate = vitals.respiration_rate,
            stress_stage = vitals.stress_stage,
            "rPPG session complete"
        );
        self.latest_vitals = Some(vitals);

        Ok(SessionReport {
            session_id: session.id,
            vitals,
            waveform: signal.filtered,
            samples,
        })
    }

    /// Cancel the running session and discard its buffer.
    ///
    /// Returns false when no session was running.
    pub fn stop_session(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        let was_active = session.active.swap(false, Ordering::AcqRel);
        info!(
            session_id = %session.id,
            samples = session.buffer.len(),
            "rPPG session stopped"
        );
        was_active
    }

    pub fn session(&self) -> Option<&RppgSession> {
        self.session.as_ref()
    }

    pub fn is_session_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_active())
    }

    /// Vitals of the last successful session
    pub fn latest_vitals(&self) -> Option<VitalsSnapshot> {
        self.latest_vitals
    }

    /// Snapshot of the last analyzed frame
    pub fn last_drowsiness(&self) -> Option<DrowsinessSnapshot> {
        self.last_drowsiness
    }

    pub fn drowsiness_score(&self) -> DrowsinessScore {
        self.drowsiness.score()
    }

    pub fn drowsiness(&self) -> &DrowsinessAnalyzer {
        &self.drowsiness
    }
}
