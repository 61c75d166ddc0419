//! FFI bindings
//!
//! C-compatible functions for calling the throughput engine from the
//! data-collection app. All inputs and outputs are null-terminated JSON
//! strings; returned strings are allocated here and must be released with
//! `fitts_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::AnalysisConfig;
use crate::pipeline::{analyze_sequence_json, BlockProcessor};
use crate::report::SessionMetadata;

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

// ============================================================================
// Stateless API
// ============================================================================

/// Analyse one sequence document and return per-trial values and measures as JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `fitts_free_string`.
/// - Returns NULL on error; call `fitts_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitts_analyze_sequence(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match analyze_sequence_json(&json_str) {
        Ok(result) => string_to_cstr(&result),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a BlockProcessor
pub struct FittsProcessorHandle {
    processor: BlockProcessor,
}

/// Create a block processor.
///
/// # Safety
/// - `config_json` and `metadata_json` must each be NULL (use defaults) or a
///   valid null-terminated C string.
/// - Returns a pointer that must be freed with `fitts_processor_free`.
/// - Returns NULL on error; call `fitts_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitts_processor_new(
    config_json: *const c_char,
    metadata_json: *const c_char,
) -> *mut FittsProcessorHandle {
    clear_last_error();

    let config = match cstr_to_string(config_json) {
        Some(json) => match AnalysisConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        },
        None => AnalysisConfig::default(),
    };

    let metadata = match cstr_to_string(metadata_json) {
        Some(json) => match serde_json::from_str::<SessionMetadata>(&json) {
            Ok(metadata) => metadata,
            Err(e) => {
                set_last_error(&format!("Invalid session metadata: {}", e));
                return ptr::null_mut();
            }
        },
        None => SessionMetadata::default(),
    };

    let handle = Box::new(FittsProcessorHandle {
        processor: BlockProcessor::new(config, metadata),
    });
    Box::into_raw(handle)
}

/// Free a block processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `fitts_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn fitts_processor_free(processor: *mut FittsProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Process one sequence document; returns the outcome (`accepted` or `repeat`) as JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `fitts_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `fitts_free_string`.
/// - Returns NULL on error; call `fitts_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitts_processor_process(
    processor: *mut FittsProcessorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match handle.processor.process_json(&json_str) {
        Ok(result) => string_to_cstr(&result),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Accepted summary records so far, as a JSON report.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `fitts_processor_new`.
/// - Returns a newly allocated string that must be freed with `fitts_free_string`.
/// - Returns NULL on error; call `fitts_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitts_processor_records(
    processor: *mut FittsProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    match handle.processor.report_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by a `fitts_*` function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a `fitts_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn fitts_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next `fitts_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn fitts_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn fitts_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_sequence_json() -> CString {
        CString::new(
            r#"{
            "condition": { "amplitude": 300, "width": 50 },
            "task_type": "one_dimensional",
            "response_type": "serial",
            "trials": [
                { "from": {"x": 0, "y": 0},   "to": {"x": 300, "y": 0}, "select": {"x": 304, "y": 2},  "movement_time_ms": 380 },
                { "from": {"x": 300, "y": 0}, "to": {"x": 0, "y": 0},   "select": {"x": 7, "y": -1},   "movement_time_ms": 402 },
                { "from": {"x": 0, "y": 0},   "to": {"x": 300, "y": 0}, "select": {"x": 289, "y": 0},  "movement_time_ms": 371 }
            ]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_analyze_sequence() {
        let json = sample_sequence_json();

        unsafe {
            let result = fitts_analyze_sequence(json.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("throughput_bps"));

            fitts_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        unsafe {
            let metadata = CString::new(r#"{ "participant": "P03" }"#).unwrap();
            let processor = fitts_processor_new(ptr::null(), metadata.as_ptr());
            assert!(!processor.is_null());

            let json = sample_sequence_json();
            let outcome = fitts_processor_process(processor, json.as_ptr());
            assert!(!outcome.is_null());
            let outcome_str = CStr::from_ptr(outcome).to_str().unwrap();
            assert!(outcome_str.contains("\"status\":\"accepted\""));
            fitts_free_string(outcome);

            let records = fitts_processor_records(processor);
            assert!(!records.is_null());
            let records_str = CStr::from_ptr(records).to_str().unwrap();
            assert!(records_str.contains("P03"));
            fitts_free_string(records);

            fitts_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_bad_config_rejected() {
        unsafe {
            let config = CString::new(r#"{ "outlier": { "fraction": 7 } }"#).unwrap();
            let processor = fitts_processor_new(config.as_ptr(), ptr::null());
            assert!(processor.is_null());
            assert!(!fitts_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let result = fitts_analyze_sequence(invalid_json.as_ptr());
            assert!(result.is_null());

            let error = fitts_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let null_processor = fitts_processor_process(ptr::null_mut(), invalid_json.as_ptr());
            assert!(null_processor.is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = fitts_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
