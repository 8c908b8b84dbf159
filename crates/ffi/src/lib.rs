//! C interface to the compartment fire engine.
//!
//! A host creates one [`CompartmentFireInstance`] per building, adds compartments and
//! openings, then calls `cfire_step` once per frame. Every entry point returns a
//! [`CFireErrorCode`]; on failure `cfire_get_last_error` describes what went wrong.
//! Results are written through out-parameters.

mod error;
mod helpers;
mod instance;
mod network;
mod queries;

pub use error::{cfire_get_last_error, cfire_get_last_error_code, CFireErrorCode};
pub use instance::{cfire_network_destroy, cfire_network_new, CompartmentFireInstance};
pub use network::{cfire_add_compartment, cfire_add_opening, cfire_reset, cfire_step};
pub use queries::{
    cfire_compartment_count, cfire_get_exchange_summary, cfire_get_flow, cfire_get_pressure,
    cfire_get_zone_snapshot, ExchangeStats, ZoneSnapshot,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::ptr;

    fn new_network() -> *mut CompartmentFireInstance {
        let mut instance = ptr::null_mut();
        assert_eq!(unsafe { cfire_network_new(&mut instance) }, CFireErrorCode::Ok);
        assert!(!instance.is_null());
        instance
    }

    fn add_room(net: *const CompartmentFireInstance, height_m: f64) -> usize {
        let mut id = usize::MAX;
        let code =
            unsafe { cfire_add_compartment(net, height_m, 20.0, 2, 293.15, 101325.0, &mut id) };
        assert_eq!(code, CFireErrorCode::Ok);
        id
    }

    fn last_error() -> String {
        let msg = cfire_get_last_error();
        assert!(!msg.is_null());
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }

    #[test]
    fn test_network_lifecycle() {
        let net = new_network();
        let room = add_room(net, 3.0);
        let hall = add_room(net, 3.0);
        assert_eq!((room, hall), (0, 1));
        assert_eq!(
            unsafe { cfire_add_opening(net, room, hall, 2.0, 0.9, 0.65) },
            CFireErrorCode::Ok
        );

        let hrr = [250_000.0, 0.0];
        for _ in 0..10 {
            assert_eq!(
                unsafe { cfire_step(net, 1.0, hrr.as_ptr(), hrr.len()) },
                CFireErrorCode::Ok
            );
        }
        assert!(cfire_get_last_error().is_null());
        assert_eq!(cfire_get_last_error_code(), CFireErrorCode::Ok);

        let mut count = 0;
        assert_eq!(unsafe { cfire_compartment_count(net, &mut count) }, CFireErrorCode::Ok);
        assert_eq!(count, 2);

        let mut snapshot = ZoneSnapshot::default();
        assert_eq!(
            unsafe { cfire_get_zone_snapshot(net, room, &mut snapshot) },
            CFireErrorCode::Ok
        );
        assert!(snapshot.upper_temperature_k > snapshot.lower_temperature_k);
        let heights = snapshot.upper_height_m + snapshot.middle_height_m + snapshot.lower_height_m;
        assert!((heights - 3.0).abs() < 1e-9);
        assert_eq!(snapshot.smoke_layer_height_m, snapshot.lower_height_m);

        let mut pressure = 0.0;
        assert_eq!(unsafe { cfire_get_pressure(net, room, &mut pressure) }, CFireErrorCode::Ok);
        assert!(pressure.is_finite() && pressure > 0.0);

        let mut flow = -1.0;
        assert_eq!(unsafe { cfire_get_flow(net, room, hall, &mut flow) }, CFireErrorCode::Ok);
        assert!(flow >= 0.0);

        let mut stats = ExchangeStats::default();
        assert_eq!(
            unsafe { cfire_get_exchange_summary(net, room, &mut stats) },
            CFireErrorCode::Ok
        );
        assert!(stats.ach >= 0.5);

        assert_eq!(unsafe { cfire_reset(net) }, CFireErrorCode::Ok);
        assert_eq!(unsafe { cfire_compartment_count(net, &mut count) }, CFireErrorCode::Ok);
        assert_eq!(count, 0);

        unsafe { cfire_network_destroy(net) };
    }

    #[test]
    fn test_null_pointers_are_reported() {
        assert_eq!(
            unsafe { cfire_network_new(ptr::null_mut()) },
            CFireErrorCode::NullPointer
        );
        assert!(last_error().contains("out_instance"));

        let hrr = [0.0];
        assert_eq!(
            unsafe { cfire_step(ptr::null(), 1.0, hrr.as_ptr(), 1) },
            CFireErrorCode::NullPointer
        );
        assert_eq!(cfire_get_last_error_code(), CFireErrorCode::NullPointer);

        let net = new_network();
        add_room(net, 3.0);
        assert_eq!(
            unsafe { cfire_step(net, 1.0, ptr::null(), 1) },
            CFireErrorCode::NullPointer
        );
        assert!(last_error().contains("hrr_ptr"));
        assert_eq!(
            unsafe { cfire_get_pressure(net, 0, ptr::null_mut()) },
            CFireErrorCode::NullPointer
        );

        // Destroying null is a no-op
        unsafe { cfire_network_destroy(ptr::null_mut()) };
        unsafe { cfire_network_destroy(net) };
    }

    #[test]
    fn test_engine_errors_map_to_codes() {
        let net = new_network();
        let room = add_room(net, 3.0);

        let mut id = usize::MAX;
        assert_eq!(
            unsafe { cfire_add_compartment(net, -1.0, 20.0, 2, 293.15, 101325.0, &mut id) },
            CFireErrorCode::InvalidArgument
        );
        assert_eq!(id, usize::MAX);
        assert_eq!(
            unsafe { cfire_add_opening(net, room, room, 2.0, 0.9, 0.65) },
            CFireErrorCode::InvalidArgument
        );
        assert!(last_error().contains("invalid argument"));

        let hrr = [0.0, 0.0];
        assert_eq!(
            unsafe { cfire_step(net, 1.0, hrr.as_ptr(), hrr.len()) },
            CFireErrorCode::InvalidArgument
        );
        assert_eq!(
            unsafe { cfire_step(net, 0.0, hrr.as_ptr(), 1) },
            CFireErrorCode::InvalidArgument
        );

        let mut snapshot = ZoneSnapshot::default();
        assert_eq!(
            unsafe { cfire_get_zone_snapshot(net, 7, &mut snapshot) },
            CFireErrorCode::OutOfRange
        );
        assert_eq!(cfire_get_last_error_code(), CFireErrorCode::OutOfRange);

        // A successful call clears the previous error
        let mut count = 0;
        assert_eq!(unsafe { cfire_compartment_count(net, &mut count) }, CFireErrorCode::Ok);
        assert!(cfire_get_last_error().is_null());

        unsafe { cfire_network_destroy(net) };
    }
}
