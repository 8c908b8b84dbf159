use compartment_fire_core::{ExchangeSummary, ThreeZoneModel};

use crate::error::CFireErrorCode;
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, require_out, with_network};
use crate::instance::CompartmentFireInstance;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
/// FFI-friendly snapshot of a compartment's three zones.
/// Keep this layout stable for C/C++/C# consumers.
pub struct ZoneSnapshot {
    /// Upper (hot layer) zone temperature (K).
    pub upper_temperature_k: f64,
    /// Middle zone temperature (K).
    pub middle_temperature_k: f64,
    /// Lower (cool layer) zone temperature (K).
    pub lower_temperature_k: f64,

    /// Upper zone height (m).
    pub upper_height_m: f64,
    /// Middle zone height (m).
    pub middle_height_m: f64,
    /// Lower zone height (m).
    pub lower_height_m: f64,

    /// Height of the smoke layer interface above the floor (m).
    pub smoke_layer_height_m: f64,
    /// Mass-weighted mean temperature (K).
    pub average_temperature_k: f64,
}

impl From<&ThreeZoneModel> for ZoneSnapshot {
    fn from(model: &ThreeZoneModel) -> Self {
        Self {
            upper_temperature_k: model.upper_zone().temperature_k(),
            middle_temperature_k: model.middle_zone().temperature_k(),
            lower_temperature_k: model.lower_zone().temperature_k(),
            upper_height_m: model.upper_zone().height_m(),
            middle_height_m: model.middle_zone().height_m(),
            lower_height_m: model.lower_zone().height_m(),
            smoke_layer_height_m: model.smoke_layer_height_m(),
            average_temperature_k: model.average_temperature_k(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
/// FFI-friendly copy of the last step's exchange summary for one compartment.
pub struct ExchangeStats {
    /// Mass received from other compartments (kg).
    pub mass_in_kg: f64,
    /// Mass sent to other compartments (kg).
    pub mass_out_kg: f64,
    /// Air changes per hour passed to the zone model.
    pub ach: f64,
    /// Net enthalpy gain rate (W).
    pub net_exchange_w: f64,
    /// Enthalpy received (J).
    pub enthalpy_in_j: f64,
    /// Enthalpy sent (J).
    pub enthalpy_out_j: f64,
}

impl From<ExchangeSummary> for ExchangeStats {
    fn from(summary: ExchangeSummary) -> Self {
        Self {
            mass_in_kg: summary.mass_in_kg,
            mass_out_kg: summary.mass_out_kg,
            ach: summary.ach,
            net_exchange_w: summary.net_exchange_w,
            enthalpy_in_j: summary.enthalpy_in_j,
            enthalpy_out_j: summary.enthalpy_out_j,
        }
    }
}

/// Write the number of compartments to `out_count`.
///
/// # Safety
/// - `ptr` must be a live instance from `cfire_network_new`.
/// - `out_count` must point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn cfire_compartment_count(
    ptr: *const CompartmentFireInstance,
    out_count: *mut usize,
) -> CFireErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: forwarded from the caller contract.
        let instance = unsafe { instance_from_ptr(ptr) }?;
        require_out(out_count, "out_count")?;
        let count = with_network(instance, |network| Ok(network.compartment_count()))?;
        // SAFETY: checked non-null above.
        unsafe { out_count.write(count) };
        Ok(())
    })
}

/// Write the pressure of compartment `id` from the last step (Pa) to `out_pa`.
///
/// # Safety
/// - `ptr` must be a live instance from `cfire_network_new`.
/// - `out_pa` must point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn cfire_get_pressure(
    ptr: *const CompartmentFireInstance,
    id: usize,
    out_pa: *mut f64,
) -> CFireErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: forwarded from the caller contract.
        let instance = unsafe { instance_from_ptr(ptr) }?;
        require_out(out_pa, "out_pa")?;
        let pressure = with_network(instance, |network| network.compartment_pressure(id))?;
        // SAFETY: checked non-null above.
        unsafe { out_pa.write(pressure) };
        Ok(())
    })
}

/// Write the mass flow from compartment `from` to `to` in the last step (kg/s).
///
/// # Safety
/// - `ptr` must be a live instance from `cfire_network_new`.
/// - `out_kg_per_s` must point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn cfire_get_flow(
    ptr: *const CompartmentFireInstance,
    from: usize,
    to: usize,
    out_kg_per_s: *mut f64,
) -> CFireErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: forwarded from the caller contract.
        let instance = unsafe { instance_from_ptr(ptr) }?;
        require_out(out_kg_per_s, "out_kg_per_s")?;
        let flow = with_network(instance, |network| network.inter_compartment_flow(from, to))?;
        // SAFETY: checked non-null above.
        unsafe { out_kg_per_s.write(flow) };
        Ok(())
    })
}

/// Copy the zone state of compartment `id` into `out_snapshot`.
///
/// # Safety
/// - `ptr` must be a live instance from `cfire_network_new`.
/// - `out_snapshot` must point to a writable `ZoneSnapshot`.
#[no_mangle]
pub unsafe extern "C" fn cfire_get_zone_snapshot(
    ptr: *const CompartmentFireInstance,
    id: usize,
    out_snapshot: *mut ZoneSnapshot,
) -> CFireErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: forwarded from the caller contract.
        let instance = unsafe { instance_from_ptr(ptr) }?;
        require_out(out_snapshot, "out_snapshot")?;
        let snapshot = with_network(instance, |network| {
            network.compartment(id).map(ZoneSnapshot::from)
        })?;
        // SAFETY: checked non-null above.
        unsafe { out_snapshot.write(snapshot) };
        Ok(())
    })
}

/// Copy the last step's exchange summary of compartment `id` into `out_stats`.
///
/// Before the first step every field is zero.
///
/// # Safety
/// - `ptr` must be a live instance from `cfire_network_new`.
/// - `out_stats` must point to a writable `ExchangeStats`.
#[no_mangle]
pub unsafe extern "C" fn cfire_get_exchange_summary(
    ptr: *const CompartmentFireInstance,
    id: usize,
    out_stats: *mut ExchangeStats,
) -> CFireErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: forwarded from the caller contract.
        let instance = unsafe { instance_from_ptr(ptr) }?;
        require_out(out_stats, "out_stats")?;
        let stats = with_network(instance, |network| {
            network.exchange_summary(id).map(ExchangeStats::from)
        })?;
        // SAFETY: checked non-null above.
        unsafe { out_stats.write(stats) };
        Ok(())
    })
}
