//! FFI bindings for the CRDO core
//!
//! This module provides C-compatible functions for driving sessions and the
//! activity processor from a mobile UI shell. All functions use C strings
//! (null-terminated) and return allocated memory that must be freed by the
//! caller using `crdo_free_string`.
//!
//! Session handles are internally locked, so the location callback and the
//! clock timer may call into the same handle from different threads.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::TrackerError;
use crate::processor::ActivityProcessor;
use crate::session::SampleOutcome;
use crate::shared::SharedSession;
use crate::types::{Coordinate, LocationSample, SessionState, WorkoutRecord};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Serialize `value` into a newly allocated C string, or record the error
fn json_to_cstr<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Optional config JSON; NULL selects the defaults
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<EngineConfig, TrackerError> {
    match cstr_to_string(config_json) {
        Some(json) => EngineConfig::from_json(&json),
        None => Ok(EngineConfig::default()),
    }
}

// ============================================================================
// Session API
// ============================================================================

/// Opaque handle to a session
pub struct CrdoSessionHandle {
    session: SharedSession,
}

/// Create an idle session.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Must be freed with `crdo_session_free`.
/// - Returns NULL on error; call `crdo_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn crdo_session_new(config_json: *const c_char) -> *mut CrdoSessionHandle {
    clear_last_error();

    let session = match config_from_ptr(config_json).and_then(SharedSession::new) {
        Ok(session) => session,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    Box::into_raw(Box::new(CrdoSessionHandle { session }))
}

/// Free a session.
///
/// # Safety
/// - `session` must be a valid pointer returned by `crdo_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn crdo_session_free(session: *mut CrdoSessionHandle) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

unsafe fn session_transition(
    session: *const CrdoSessionHandle,
    f: impl FnOnce(&SharedSession) -> Result<SessionState, TrackerError>,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    match f(&(*session).session) {
        Ok(state) => json_to_cstr(&state),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Start the session. Returns the new state as JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `crdo_session_new`.
/// - Returns a newly allocated string that must be freed with `crdo_free_string`.
/// - Returns NULL on error; call `crdo_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn crdo_session_start(session: *const CrdoSessionHandle) -> *mut c_char {
    session_transition(session, SharedSession::start)
}

/// Step the countdown. Returns the new state as JSON.
///
/// # Safety
/// Same contract as `crdo_session_start`.
#[no_mangle]
pub unsafe extern "C" fn crdo_session_advance_countdown(
    session: *const CrdoSessionHandle,
) -> *mut c_char {
    session_transition(session, SharedSession::advance_countdown)
}

/// Abort during the countdown.
///
/// # Safety
/// Same contract as `crdo_session_start`.
#[no_mangle]
pub unsafe extern "C" fn crdo_session_cancel(session: *const CrdoSessionHandle) -> *mut c_char {
    session_transition(session, SharedSession::cancel)
}

/// # Safety
/// Same contract as `crdo_session_start`.
#[no_mangle]
pub unsafe extern "C" fn crdo_session_pause(session: *const CrdoSessionHandle) -> *mut c_char {
    session_transition(session, SharedSession::pause)
}

/// # Safety
/// Same contract as `crdo_session_start`.
#[no_mangle]
pub unsafe extern "C" fn crdo_session_resume(session: *const CrdoSessionHandle) -> *mut c_char {
    session_transition(session, SharedSession::resume)
}

/// End the session now.
///
/// # Safety
/// Same contract as `crdo_session_start`.
#[no_mangle]
pub unsafe extern "C" fn crdo_session_end(session: *const CrdoSessionHandle) -> *mut c_char {
    session_transition(session, SharedSession::end)
}

/// Advance the session clock by one tick.
///
/// # Safety
/// Same contract as `crdo_session_start`.
#[no_mangle]
pub unsafe extern "C" fn crdo_session_tick(session: *const CrdoSessionHandle) -> *mut c_char {
    session_transition(session, |s| Ok(s.tick()))
}

/// Advance the session clock by `elapsed_ms` milliseconds.
///
/// # Safety
/// Same contract as `crdo_session_start`.
#[no_mangle]
pub unsafe extern "C" fn crdo_session_advance_ms(
    session: *const CrdoSessionHandle,
    elapsed_ms: u64,
) -> *mut c_char {
    session_transition(session, |s| Ok(s.advance(Duration::from_millis(elapsed_ms))))
}

/// Offer a location sample stamped with the current time. A negative
/// `speed_mps` means the device did not report a speed.
///
/// # Safety
/// - `session` must be a valid pointer returned by `crdo_session_new`.
/// - Returns 1 if the sample was applied, 0 if it was discarded, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn crdo_session_process_sample(
    session: *const CrdoSessionHandle,
    latitude: f64,
    longitude: f64,
    speed_mps: f64,
) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let sample = LocationSample::new(Coordinate::new(latitude, longitude), speed_mps, Utc::now());
    match (*session).session.process_sample(&sample) {
        SampleOutcome::Applied(_) => 1,
        SampleOutcome::Discarded => 0,
    }
}

/// Current state and live aggregates as JSON.
///
/// # Safety
/// Same contract as `crdo_session_start`.
#[no_mangle]
pub unsafe extern "C" fn crdo_session_snapshot(session: *const CrdoSessionHandle) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    json_to_cstr(&(*session).session.snapshot())
}

/// Take the finished workout as JSON. Returns NULL without setting an error
/// when no workout is waiting.
///
/// # Safety
/// Same contract as `crdo_session_start`.
#[no_mangle]
pub unsafe extern "C" fn crdo_session_take_workout(
    session: *const CrdoSessionHandle,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    match (*session).session.take_workout() {
        Some(workout) => json_to_cstr(&workout),
        None => ptr::null_mut(),
    }
}

// ============================================================================
// Processor API
// ============================================================================

/// Opaque handle to an ActivityProcessor
pub struct CrdoProcessorHandle {
    processor: ActivityProcessor,
}

/// Create a processor with in-memory stores.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Must be freed with `crdo_processor_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn crdo_processor_new(
    config_json: *const c_char,
) -> *mut CrdoProcessorHandle {
    clear_last_error();

    let processor = match config_from_ptr(config_json).and_then(ActivityProcessor::new) {
        Ok(processor) => processor,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    Box::into_raw(Box::new(CrdoProcessorHandle { processor }))
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `crdo_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn crdo_processor_free(processor: *mut CrdoProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Record a workout given as JSON. Returns the record outcome as JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `crdo_processor_new`.
/// - `workout_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `crdo_free_string`.
/// - Returns NULL on error; call `crdo_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn crdo_processor_record_workout(
    processor: *mut CrdoProcessorHandle,
    workout_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(workout_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid workout JSON string pointer");
            return ptr::null_mut();
        }
    };

    match serde_json::from_str::<WorkoutRecord>(&json_str) {
        Ok(workout) => json_to_cstr(&handle.processor.record_workout(workout)),
        Err(e) => {
            set_last_error(&TrackerError::from(e).to_string());
            ptr::null_mut()
        }
    }
}

/// Take the finished workout from `session` and record it.
///
/// # Safety
/// - `processor` and `session` must be valid handles.
/// - Returns NULL with an error set when the session has no finished workout.
#[no_mangle]
pub unsafe extern "C" fn crdo_processor_record_session(
    processor: *mut CrdoProcessorHandle,
    session: *const CrdoSessionHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() || session.is_null() {
        set_last_error("Null processor or session pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    match (*session).session.take_workout() {
        Some(workout) => json_to_cstr(&handle.processor.record_workout(workout)),
        None => {
            set_last_error("Session has no finished workout");
            ptr::null_mut()
        }
    }
}

/// Progression stats as JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `crdo_processor_new`.
/// - Returns a newly allocated string that must be freed with `crdo_free_string`.
#[no_mangle]
pub unsafe extern "C" fn crdo_processor_stats(
    processor: *const CrdoProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    json_to_cstr((*processor).processor.stats())
}

/// History totals and per-category counts as JSON.
///
/// # Safety
/// Same contract as `crdo_processor_stats`.
#[no_mangle]
pub unsafe extern "C" fn crdo_processor_history_summary(
    processor: *const CrdoProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    json_to_cstr(&(*processor).processor.history_summary())
}

/// Current streak. `today` is an ISO date (`YYYY-MM-DD`) or NULL for the
/// local date.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `crdo_processor_new`.
/// - Returns -1 on error.
#[no_mangle]
pub unsafe extern "C" fn crdo_processor_current_streak(
    processor: *const CrdoProcessorHandle,
    today: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let today = match cstr_to_string(today) {
        Some(s) => match s.parse::<NaiveDate>() {
            Ok(day) => day,
            Err(e) => {
                set_last_error(&format!("Invalid date '{s}': {e}"));
                return -1;
            }
        },
        None => Local::now().date_naive(),
    };

    let streak = (*processor).processor.current_streak(today);
    i32::try_from(streak).unwrap_or(i32::MAX)
}

/// Export all data. `base64` non-zero selects the obfuscated variant.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `crdo_processor_new`.
/// - Returns a newly allocated string that must be freed with `crdo_free_string`.
/// - Returns NULL on error; call `crdo_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn crdo_processor_export(
    processor: *const CrdoProcessorHandle,
    base64: i32,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let document = (*processor).processor.export();
    let encoded = if base64 != 0 {
        document.to_base64()
    } else {
        document.to_json()
    };

    match encoded {
        Ok(text) => string_to_cstr(&text),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Import an export document in either encoding. Nothing changes on failure.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `crdo_processor_new`.
/// - `input` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `crdo_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn crdo_processor_import(
    processor: *mut CrdoProcessorHandle,
    input: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let input_str = match cstr_to_string(input) {
        Some(s) => s,
        None => {
            set_last_error("Invalid input string pointer");
            return -1;
        }
    };

    match handle.processor.import_str(&input_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by CRDO functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a CRDO function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn crdo_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next CRDO function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn crdo_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn crdo_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
