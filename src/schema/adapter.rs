//! Adapter for converting pulsecam.frame_event.v1 recordings to monitor inputs
//!
//! Parsing accepts either NDJSON (one event per line) or a JSON array.
//! Conversion validates every event and requires timestamps that never go
//! backwards, since the replay drives session timers from them.

use crate::error::ComputeError;
use crate::schema::frame_event::*;
use crate::types::{Detection, InferenceResult, LandmarkFrame, Point2};

/// One input for a [`crate::session::FaceMonitor`]
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorInput {
    StartSession,
    StopSession,
    Frame(Detection),
    Inference(InferenceResult),
}

/// A monitor input with its recording timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct TimedInput {
    pub t_ms: u64,
    pub input: MonitorInput,
}

/// Adapter for converting frame events to monitor inputs
pub struct FrameEventAdapter;

impl FrameEventAdapter {
    /// Parse a JSON string containing an array of FrameEvents
    pub fn parse_array(json: &str) -> Result<Vec<FrameEvent>, ComputeError> {
        let events: Vec<FrameEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON) containing FrameEvents
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<FrameEvent>, ComputeError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<FrameEvent>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(events)
    }

    /// Parse either format: a leading `[` selects the array form
    pub fn parse(input: &str) -> Result<Vec<FrameEvent>, ComputeError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Validate and convert events, in recording order
    pub fn to_inputs(events: &[FrameEvent]) -> Result<Vec<TimedInput>, ComputeError> {
        if let Some(first) = Self::validate_events(events).into_iter().next() {
            return Err(ComputeError::ParseError(format!(
                "Invalid event {} at {} ms: {}",
                first.index, first.t_ms, first.error
            )));
        }

        events
            .iter()
            .map(|event| {
                Ok(TimedInput {
                    t_ms: event.t_ms,
                    input: Self::to_input(event)?,
                })
            })
            .collect()
    }

    fn to_input(event: &FrameEvent) -> Result<MonitorInput, ComputeError> {
        let input = match event.kind {
            EventKind::Start => MonitorInput::StartSession,
            EventKind::Stop => MonitorInput::StopSession,
            EventKind::Frame => match &event.landmarks {
                Some(points) => {
                    let points = points.iter().map(|&[x, y]| Point2::new(x, y)).collect();
                    MonitorInput::Frame(Detection::Detected(LandmarkFrame::new(points)?))
                }
                None => MonitorInput::Frame(Detection::NotDetected),
            },
            EventKind::Inference => match &event.values {
                Some(values) => MonitorInput::Inference(InferenceResult::Values(values.clone())),
                None => MonitorInput::Inference(InferenceResult::ModelNotReady),
            },
        };
        Ok(input)
    }

    /// Validate a batch of events, returning every failure
    pub fn validate_events(events: &[FrameEvent]) -> Vec<ValidationResult> {
        let mut failures = Vec::new();
        let mut previous: Option<u64> = None;

        for (index, event) in events.iter().enumerate() {
            if let Err(error) = event.validate() {
                failures.push(ValidationResult {
                    index,
                    t_ms: event.t_ms,
                    error,
                });
            }
            if let Some(prev) = previous.filter(|&p| event.t_ms < p) {
                failures.push(ValidationResult {
                    index,
                    t_ms: event.t_ms,
                    error: ValidationError::OutOfOrder {
                        previous: prev,
                        current: event.t_ms,
                    },
                });
            }
            previous = Some(previous.map_or(event.t_ms, |p| p.max(event.t_ms)));
        }
        failures
    }
}

/// One failed event
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub t_ms: u64,
    pub error: ValidationError,
}
