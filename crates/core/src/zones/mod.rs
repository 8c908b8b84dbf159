//! Vertically stratified zone transport

mod three_zone;
mod zone;

pub use three_zone::{ThreeZoneModel, ZoneCoupling};
pub use zone::Zone;
