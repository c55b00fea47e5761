//! Recorded pulsecam.frame_event.v1 input
//!
//! This module defines the timestamped event schema used to record a
//! monitoring run and replay it offline through the same monitor.

mod adapter;
mod frame_event;

pub use adapter::*;
pub use frame_event::*;
