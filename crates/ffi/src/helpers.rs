use std::ffi::CString;

use compartment_fire_core::{CompartmentNetwork, EngineError};

use crate::error::{
    with_last_error_mut, CFireErrorCode, CompartmentFireError, DefaultCompartmentFireError,
};
use crate::instance::CompartmentFireInstance;

/// Set the thread-local error message and code.
/// Accepts any type implementing the `CompartmentFireError` trait.
pub(crate) fn set_last_error(error: &impl CompartmentFireError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl CompartmentFireError) -> CFireErrorCode {
    set_last_error(error);
    error.code()
}

/// Clear the thread-local error message and code.
/// Called on successful operations.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = CFireErrorCode::Ok;
    });
}

/// Record the outcome of an operation: clear the last error on success, store it on failure.
pub(crate) fn track_result<T>(
    result: Result<T, DefaultCompartmentFireError>,
) -> Result<T, CFireErrorCode> {
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(error) => Err(track_error(&error)),
    }
}

/// Run an FFI body and collapse its outcome into the returned status code.
pub(crate) fn handle_ffi_result_error<F>(body: F) -> CFireErrorCode
where
    F: FnOnce() -> Result<(), DefaultCompartmentFireError>,
{
    match track_result(body()) {
        Ok(()) => CFireErrorCode::Ok,
        Err(code) => code,
    }
}

/// Borrow an instance from a raw pointer handed in by the host.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `cfire_network_new`.
pub(crate) unsafe fn instance_from_ptr<'a>(
    ptr: *const CompartmentFireInstance,
) -> Result<&'a CompartmentFireInstance, DefaultCompartmentFireError> {
    // SAFETY: non-null pointers come from `Box::into_raw` in `cfire_network_new`
    // and stay valid until `cfire_network_destroy`.
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultCompartmentFireError::null_pointer("ptr"))
}

/// Fail early on a null out-parameter before any state is touched.
pub(crate) fn require_out<T>(out: *mut T, name: &str) -> Result<(), DefaultCompartmentFireError> {
    if out.is_null() {
        Err(DefaultCompartmentFireError::null_pointer(name))
    } else {
        Ok(())
    }
}

/// Run a query under the read lock.
pub(crate) fn with_network<F, T>(
    instance: &CompartmentFireInstance,
    func: F,
) -> Result<T, DefaultCompartmentFireError>
where
    F: FnOnce(&CompartmentNetwork) -> Result<T, EngineError>,
{
    let network = instance
        .network
        .read()
        .map_err(|_| DefaultCompartmentFireError::lock_poisoned("network"))?;
    func(&network).map_err(Into::into)
}

/// Run a mutation under the write lock.
pub(crate) fn with_network_mut<F, T>(
    instance: &CompartmentFireInstance,
    func: F,
) -> Result<T, DefaultCompartmentFireError>
where
    F: FnOnce(&mut CompartmentNetwork) -> Result<T, EngineError>,
{
    let mut network = instance
        .network
        .write()
        .map_err(|_| DefaultCompartmentFireError::lock_poisoned("network"))?;
    func(&mut network).map_err(Into::into)
}
