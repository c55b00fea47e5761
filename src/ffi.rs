//! FFI bindings for Pulsecam
//!
//! This module provides C-compatible functions for embedding a face monitor in
//! a capture host. Strings returned by these functions are allocated here and
//! must be freed by the caller using `pulsecam_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::slice;

use crate::config::MonitorConfig;
use crate::encoder::SnapshotEncoder;
use crate::error::ComputeError;
use crate::session::{FaceMonitor, FrameOutcome, TickOutcome};
use crate::types::{Detection, InferenceResult, LandmarkFrame};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn json_or_error(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Monitor API
// ============================================================================

/// Opaque handle to a FaceMonitor
pub struct MonitorHandle {
    monitor: FaceMonitor,
    encoder: SnapshotEncoder,
}

/// Create a monitor.
///
/// # Safety
/// - `config_json` must be NULL (defaults) or a valid null-terminated C string.
/// - Must be freed with `pulsecam_monitor_free`.
/// - Returns NULL on error; call `pulsecam_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn pulsecam_monitor_new(config_json: *const c_char) -> *mut MonitorHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        MonitorConfig::default()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string");
                return ptr::null_mut();
            }
        };
        match MonitorConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    match FaceMonitor::new(config) {
        Ok(monitor) => Box::into_raw(Box::new(MonitorHandle {
            monitor,
            encoder: SnapshotEncoder::new(),
        })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a monitor.
///
/// # Safety
/// - `monitor` must be a pointer returned by `pulsecam_monitor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pulsecam_monitor_free(monitor: *mut MonitorHandle) {
    if !monitor.is_null() {
        drop(Box::from_raw(monitor));
    }
}

/// Start a timed rPPG session at `now_ms`.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `pulsecam_monitor_new`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn pulsecam_monitor_start_session(
    monitor: *mut MonitorHandle,
    now_ms: u64,
) -> i32 {
    clear_last_error();

    if monitor.is_null() {
        set_last_error("Null monitor pointer");
        return -1;
    }
    let handle = &mut *monitor;

    match handle.monitor.start_session(now_ms) {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Feed one frame of landmarks as interleaved `x, y` pairs.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `pulsecam_monitor_new`.
/// - `xy` must point to `xy_len` readable doubles, or be NULL.
/// - NULL `xy` or `xy_len == 0` means no face: returns NULL with no error.
/// - Otherwise returns a drowsiness report JSON that must be freed with
///   `pulsecam_free_string`, or NULL on error.
#[no_mangle]
pub unsafe extern "C" fn pulsecam_monitor_push_landmarks(
    monitor: *mut MonitorHandle,
    xy: *const f64,
    xy_len: usize,
) -> *mut c_char {
    clear_last_error();

    if monitor.is_null() {
        set_last_error("Null monitor pointer");
        return ptr::null_mut();
    }
    let handle = &mut *monitor;

    let detection = if xy.is_null() || xy_len == 0 {
        Detection::NotDetected
    } else {
        match LandmarkFrame::from_flat(slice::from_raw_parts(xy, xy_len)) {
            Ok(frame) => Detection::Detected(frame),
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    match handle.monitor.on_frame(detection) {
        FrameOutcome::Analyzed(snapshot) => {
            json_or_error(handle.encoder.encode_drowsiness_to_json(&snapshot))
        }
        FrameOutcome::Skipped => ptr::null_mut(),
    }
}

/// Feed one inference batch of raw rPPG increments.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `pulsecam_monitor_new`.
/// - `values` must point to `len` readable doubles, or be NULL (model not ready).
/// - Returns the number of increments kept, 0 when the tick was skipped,
///   -1 on error.
#[no_mangle]
pub unsafe extern "C" fn pulsecam_monitor_push_inference(
    monitor: *mut MonitorHandle,
    values: *const f64,
    len: usize,
) -> i64 {
    clear_last_error();

    if monitor.is_null() {
        set_last_error("Null monitor pointer");
        return -1;
    }
    let handle = &mut *monitor;

    let result = if values.is_null() {
        InferenceResult::ModelNotReady
    } else {
        InferenceResult::Values(slice::from_raw_parts(values, len).to_vec())
    };

    match handle.monitor.on_inference(result) {
        TickOutcome::Appended { accepted, .. } => accepted as i64,
        TickOutcome::ModelNotReady | TickOutcome::Ignored => 0,
    }
}

/// Close the session if its timer has elapsed at `now_ms`.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `pulsecam_monitor_new`.
/// - Returns a session report JSON (free with `pulsecam_free_string`) when
///   the session closed successfully.
/// - Returns NULL with no error while the session is still running, and NULL
///   with an error when the session closed without a result.
#[no_mangle]
pub unsafe extern "C" fn pulsecam_monitor_poll(
    monitor: *mut MonitorHandle,
    now_ms: u64,
) -> *mut c_char {
    clear_last_error();

    if monitor.is_null() {
        set_last_error("Null monitor pointer");
        return ptr::null_mut();
    }
    let handle = &mut *monitor;

    match handle.monitor.poll(now_ms) {
        Some(Ok(report)) => {
            let drowsiness = handle.monitor.last_drowsiness();
            let encoded = handle.encoder.encode(Some(&report), drowsiness.as_ref());
            json_or_error(handle.encoder.to_json(&encoded))
        }
        Some(Err(e)) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
        None => ptr::null_mut(),
    }
}

/// Cancel the running session and discard its samples.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `pulsecam_monitor_new`.
/// - Returns 1 if a session was stopped, 0 if none was running, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn pulsecam_monitor_stop_session(monitor: *mut MonitorHandle) -> i32 {
    clear_last_error();

    if monitor.is_null() {
        set_last_error("Null monitor pointer");
        return -1;
    }
    let handle = &mut *monitor;

    i32::from(handle.monitor.stop_session())
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Pulsecam functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Pulsecam function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pulsecam_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Pulsecam call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn pulsecam_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Pulsecam library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free it.
#[no_mangle]
pub unsafe extern "C" fn pulsecam_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
