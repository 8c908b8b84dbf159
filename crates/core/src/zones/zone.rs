//! A single well-mixed horizontal gas slab

use serde::{Deserialize, Serialize};

use crate::constants::{ATM_PRESSURE, CP_AIR, MW_AIR, ROOM_TEMPERATURE_K};

/// One horizontal zone of a compartment
///
/// All moles are converted to mass with the molar mass of air; the zone
/// model tracks composition but treats the gas thermally as air.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub(crate) volume_m3: f64,
    pub(crate) height_m: f64,
    pub(crate) temperature_k: f64,
    pub(crate) pressure_pa: f64,
    pub(crate) n_mol: Vec<f64>,
}

impl Zone {
    pub(crate) fn new(height_m: f64, floor_area_m2: f64, species_count: usize) -> Self {
        Self {
            volume_m3: height_m * floor_area_m2,
            height_m,
            temperature_k: ROOM_TEMPERATURE_K,
            pressure_pa: ATM_PRESSURE,
            n_mol: vec![0.0; species_count],
        }
    }

    /// Zone volume (m³)
    pub fn volume_m3(&self) -> f64 {
        self.volume_m3
    }

    /// Vertical extent (m)
    pub fn height_m(&self) -> f64 {
        self.height_m
    }

    /// Temperature (K)
    pub fn temperature_k(&self) -> f64 {
        self.temperature_k
    }

    /// Reference pressure (Pa)
    pub fn pressure_pa(&self) -> f64 {
        self.pressure_pa
    }

    /// Molar composition per species (mol)
    pub fn moles(&self) -> &[f64] {
        &self.n_mol
    }

    pub fn total_moles(&self) -> f64 {
        self.n_mol.iter().sum()
    }

    /// Total mass (kg)
    pub fn mass_kg(&self) -> f64 {
        self.total_moles() * MW_AIR
    }

    /// Density (kg/m³), 0 for a degenerate volume
    pub fn density_kg_m3(&self) -> f64 {
        if self.volume_m3 <= 0.0 {
            return 0.0;
        }
        self.mass_kg() / self.volume_m3
    }

    /// Sensible heat content `m·cp·T` (J)
    pub fn heat_content_j(&self) -> f64 {
        self.mass_kg() * CP_AIR * self.temperature_k
    }

    /// Mass used as the thermal inertia divisor, never zero
    #[inline]
    pub(crate) fn thermal_mass_kg(&self) -> f64 {
        self.mass_kg().max(1e-6)
    }

    /// Add heat `q_j` (J) to the zone as a temperature change
    #[inline]
    pub(crate) fn add_heat_j(&mut self, q_j: f64) {
        self.temperature_k += q_j / (self.thermal_mass_kg() * CP_AIR);
    }

    /// Mix `added_mol` moles at `added_temperature_k` into the zone temperature.
    ///
    /// Call after the moles have been added to `n_mol`.
    pub(crate) fn mix_incoming(&mut self, added_mol: f64, added_temperature_k: f64) {
        let total = self.total_moles();
        if added_mol <= 0.0 || total <= 0.0 {
            return;
        }
        let resident = (total - added_mol).max(0.0);
        self.temperature_k =
            (resident * self.temperature_k + added_mol * added_temperature_k) / total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_zone_is_empty_at_room_conditions() {
        let zone = Zone::new(0.9, 20.0, 3);
        assert_eq!(zone.temperature_k(), ROOM_TEMPERATURE_K);
        assert_eq!(zone.pressure_pa(), ATM_PRESSURE);
        assert_eq!(zone.moles(), &[0.0; 3]);
        assert_relative_eq!(zone.volume_m3(), 18.0);
        assert_eq!(zone.density_kg_m3(), 0.0);
    }

    #[test]
    fn test_derived_properties() {
        let mut zone = Zone::new(1.0, 20.0, 2);
        zone.n_mol[0] = 1000.0;
        zone.temperature_k = 300.0;

        assert_relative_eq!(zone.mass_kg(), 29.0);
        assert_relative_eq!(zone.density_kg_m3(), 29.0 / 20.0);
        assert_relative_eq!(zone.heat_content_j(), 29.0 * 1005.0 * 300.0);
    }

    #[test]
    fn test_mix_incoming_is_mole_weighted() {
        let mut zone = Zone::new(1.0, 20.0, 1);
        zone.n_mol[0] = 300.0;
        zone.temperature_k = 400.0;

        zone.n_mol[0] += 100.0;
        zone.mix_incoming(100.0, 300.0);
        assert_relative_eq!(zone.temperature_k, 375.0);
    }
}
