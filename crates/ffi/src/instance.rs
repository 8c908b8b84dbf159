use std::sync::RwLock;

use compartment_fire_core::CompartmentNetwork;

use crate::error::{CFireErrorCode, DefaultCompartmentFireError};
use crate::helpers::{clear_last_error, track_error};

/// A compartment network owned by the host.
///
/// # Thread Safety
/// The network sits behind an `RwLock`:
/// - **Queries** (`cfire_get_*`, `cfire_compartment_count`) take the read lock and may run
///   concurrently from any thread.
/// - **Mutations** (`cfire_add_*`, `cfire_step`, `cfire_reset`) take the write lock.
///
/// ## Example (C)
/// ```c
/// CompartmentFireInstance* net = NULL;
/// if (cfire_network_new(&net) != Ok) {
///     return;
/// }
/// size_t room = 0, hall = 0;
/// cfire_add_compartment(net, 3.0, 20.0, 2, 293.15, 101325.0, &room);
/// cfire_add_compartment(net, 3.0, 40.0, 2, 293.15, 101325.0, &hall);
/// cfire_add_opening(net, room, hall, 2.0, 0.9, 0.65);
///
/// double hrr[2] = { 250000.0, 0.0 };
/// for (int i = 0; i < 600; ++i) {
///     cfire_step(net, 0.1, hrr, 2);
/// }
/// cfire_network_destroy(net);
/// ```
pub struct CompartmentFireInstance {
    pub(crate) network: RwLock<CompartmentNetwork>,
}

impl CompartmentFireInstance {
    pub(crate) fn new() -> Box<Self> {
        Box::new(Self {
            network: RwLock::new(CompartmentNetwork::new()),
        })
    }
}

/// Create an empty compartment network and return it via out-parameter.
///
/// Returns
/// - `CFireErrorCode::Ok` (0) on success with a valid instance in `out_instance`
/// - `CFireErrorCode::NullPointer` if `out_instance` is null
///
/// # Safety
///
/// - `out_instance` must be null or a valid pointer to writable memory.
/// - The caller takes ownership of the returned instance and MUST call
///   `cfire_network_destroy` exactly once.
#[no_mangle]
pub unsafe extern "C" fn cfire_network_new(
    out_instance: *mut *mut CompartmentFireInstance,
) -> CFireErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultCompartmentFireError::null_pointer("out_instance"));
    }

    // SAFETY: `out_instance` was checked for null above and the caller guarantees it
    // points to writable memory.
    unsafe {
        *out_instance = Box::into_raw(CompartmentFireInstance::new());
    }
    clear_last_error();
    CFireErrorCode::Ok
}

/// Destroy an instance previously created by `cfire_network_new`.
///
/// Passing null is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `cfire_network_new` and not freed already.
/// - The caller must not use the pointer again after this call.
#[no_mangle]
pub unsafe extern "C" fn cfire_network_destroy(ptr: *mut CompartmentFireInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: The pointer was created by `Box::into_raw` in `cfire_network_new` and the
    // caller guarantees it has not been freed. Rebuilding the Box drops the network.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}

