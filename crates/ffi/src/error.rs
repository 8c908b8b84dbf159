use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use compartment_fire_core::EngineError;

/// Error reported across the FFI boundary: a code plus a human-readable message.
pub(crate) trait CompartmentFireError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> CFireErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultCompartmentFireError {
    code: CFireErrorCode,
    msg: String,
}

impl DefaultCompartmentFireError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`, `"ptr"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: CFireErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: CFireErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }
}

impl CompartmentFireError for DefaultCompartmentFireError {
    fn code(&self) -> CFireErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

impl From<EngineError> for DefaultCompartmentFireError {
    fn from(error: EngineError) -> Self {
        let code = match error {
            EngineError::InvalidArgument { .. } => CFireErrorCode::InvalidArgument,
            EngineError::OutOfRange { .. } => CFireErrorCode::OutOfRange,
            EngineError::IllegalState(_) => CFireErrorCode::IllegalState,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CFireErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// A value is outside its valid range (geometry, coefficient, timestep, array length).
    InvalidArgument = 3,

    /// A compartment id does not exist.
    OutOfRange = 4,

    /// Derived data was queried before it was computed.
    IllegalState = 5,
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// The `CString` is kept here so the pointer handed to C stays valid.
    static LAST_ERROR: RefCell<(Option<CString>, CFireErrorCode)> = const { RefCell::new((None, CFireErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, CFireErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, CFireErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if the last call on this thread failed.
/// - `null` if the last call succeeded or no call has been made yet.
///
/// # Thread Safety
/// Error messages are stored per-thread, so each host thread sees only its own errors.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// CFireErrorCode err = cfire_step(net, 0.1, hrr, 3);
/// if (err != Ok) {
///     const char* error = cfire_get_last_error();
///     if (error) {
///         fprintf(stderr, "step failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn cfire_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code for this thread.
///
/// Returns `CFireErrorCode::Ok` (0) when the last call succeeded.
#[no_mangle]
pub extern "C" fn cfire_get_last_error_code() -> CFireErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
