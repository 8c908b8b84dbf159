use std::slice;

use compartment_fire_core::{Opening, ThreeZoneModel};

use crate::error::{CFireErrorCode, DefaultCompartmentFireError};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, require_out, with_network_mut};
use crate::instance::CompartmentFireInstance;

/// Add a compartment, reset to the given ambient state, and return its id via `out_id`.
///
/// Returns `InvalidArgument` for non-positive geometry, a zero species count, or a
/// non-positive ambient temperature/pressure. Nothing is added on failure.
///
/// # Safety
/// - `ptr` must be a live instance from `cfire_network_new`.
/// - `out_id` must point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn cfire_add_compartment(
    ptr: *const CompartmentFireInstance,
    height_m: f64,
    floor_area_m2: f64,
    species_count: usize,
    ambient_temperature_k: f64,
    ambient_pressure_pa: f64,
    out_id: *mut usize,
) -> CFireErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: forwarded from the caller contract.
        let instance = unsafe { instance_from_ptr(ptr) }?;
        require_out(out_id, "out_id")?;

        let mut compartment = ThreeZoneModel::new(height_m, floor_area_m2, species_count)?;
        compartment.reset(ambient_temperature_k, ambient_pressure_pa)?;
        let id = with_network_mut(instance, |network| Ok(network.add_compartment(compartment)))?;

        // SAFETY: checked non-null above.
        unsafe { out_id.write(id) };
        Ok(())
    })
}

/// Connect two existing compartments with an opening.
///
/// Returns `InvalidArgument` for unknown or identical endpoints, non-positive
/// dimensions, or a discharge coefficient outside (0, 1].
///
/// # Safety
/// `ptr` must be a live instance from `cfire_network_new`.
#[no_mangle]
pub unsafe extern "C" fn cfire_add_opening(
    ptr: *const CompartmentFireInstance,
    from: usize,
    to: usize,
    height_m: f64,
    width_m: f64,
    discharge_coefficient: f64,
) -> CFireErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: forwarded from the caller contract.
        let instance = unsafe { instance_from_ptr(ptr) }?;
        let opening =
            Opening::new(from, to, height_m, width_m).with_discharge_coefficient(discharge_coefficient);
        with_network_mut(instance, |network| network.add_opening(opening))?;
        Ok(())
    })
}

/// Advance the network by `dt` seconds.
///
/// `hrr_ptr` holds one heat release rate (W) per compartment, `hrr_len` entries.
/// A length mismatch or invalid `dt` is rejected before any state changes.
///
/// # Safety
/// - `ptr` must be a live instance from `cfire_network_new`.
/// - `hrr_ptr` must point to `hrr_len` readable doubles (it may be null when `hrr_len` is 0).
#[no_mangle]
pub unsafe extern "C" fn cfire_step(
    ptr: *const CompartmentFireInstance,
    dt: f64,
    hrr_ptr: *const f64,
    hrr_len: usize,
) -> CFireErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: forwarded from the caller contract.
        let instance = unsafe { instance_from_ptr(ptr) }?;
        let heat_release_w: &[f64] = if hrr_len == 0 {
            &[]
        } else if hrr_ptr.is_null() {
            return Err(DefaultCompartmentFireError::null_pointer("hrr_ptr"));
        } else {
            // SAFETY: the caller guarantees `hrr_len` readable values behind `hrr_ptr`.
            unsafe { slice::from_raw_parts(hrr_ptr, hrr_len) }
        };
        with_network_mut(instance, |network| network.step(dt, heat_release_w))
    })
}

/// Remove every compartment and opening, leaving an empty network.
///
/// # Safety
/// `ptr` must be a live instance from `cfire_network_new`.
#[no_mangle]
pub unsafe extern "C" fn cfire_reset(ptr: *const CompartmentFireInstance) -> CFireErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: forwarded from the caller contract.
        let instance = unsafe { instance_from_ptr(ptr) }?;
        with_network_mut(instance, |network| {
            network.reset();
            Ok(())
        })
    })
}
