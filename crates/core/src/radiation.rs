//! Surface-to-surface radiative exchange
//!
//! Grey-surface radiation between an arbitrary set of surfaces with an
//! area-weighted view factor approximation and Beer-Lambert smoke attenuation.
//!
//! # View factors
//!
//! `F_ij = A_j / Σ_{k≠i} A_k` for `i ≠ j` and `F_ii = 0`. Reciprocity
//! (`F_ij·A_i = F_ji·A_j`) is then imposed pair by pair: the smaller raw factor
//! is kept for the surface with the smaller area and the other direction is
//! rescaled by the area ratio. Rows are NOT renormalized afterwards, so a row
//! may sum to less than one. This is a geometric simplification, not a solid
//! angle integral.
//!
//! # Heat flux
//!
//! `Q_ij = F_ij·ε_i·σ·A_i·(T_i⁴ − T_j⁴)·τ`, with `τ = exp(−κ·L)` evaluated at a
//! 1 m mean beam length.
//!
//! # References
//! - Modest, M. F. (2013). "Radiative Heat Transfer", 3rd ed., ch. 4 (view factor algebra)
//! - Tien, C. L. (1968). "Thermal Radiation Properties of Gases" (Beer-Lambert attenuation)

use nalgebra::DMatrix;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::STEFAN_BOLTZMANN;
use crate::error::{check_positive, check_unit_interval, EngineError, Result};
use crate::numeric::is_finite_positive;

/// Mean beam length used by the per-pair flux accessors (m)
pub const DEFAULT_BEAM_LENGTH_M: f64 = 1.0;

/// Lower clamp on the Beer-Lambert exponent
const MIN_ATTENUATION_EXPONENT: f64 = -100.0;

/// A grey radiating surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// Area (m²)
    pub area_m2: f64,
    /// Temperature (K)
    pub temperature_k: f64,
    /// Emissivity (0-1)
    pub emissivity: f64,
    /// Absorptivity (0-1)
    pub absorptivity: f64,
    /// Grouping key; surfaces with the same id belong to the same zone
    pub zone_id: i32,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            area_m2: 1.0,
            temperature_k: 298.15,
            emissivity: 0.9,
            absorptivity: 0.9,
            zone_id: 0,
        }
    }
}

impl Surface {
    pub fn new(
        area_m2: f64,
        temperature_k: f64,
        emissivity: f64,
        absorptivity: f64,
        zone_id: i32,
    ) -> Self {
        Self {
            area_m2,
            temperature_k,
            emissivity,
            absorptivity,
            zone_id,
        }
    }

    fn validate(&self) -> Result<()> {
        check_positive("area_m2", self.area_m2)?;
        check_positive("temperature_k", self.temperature_k)?;
        check_unit_interval("emissivity", self.emissivity)?;
        check_unit_interval("absorptivity", self.absorptivity)?;
        Ok(())
    }

    /// Blackbody-weighted emissive power `ε·σ·A·T⁴` (W)
    pub fn emissive_power_w(&self) -> f64 {
        self.emissivity * STEFAN_BOLTZMANN * self.area_m2 * self.temperature_k.powi(4)
    }
}

/// Radiative exchange between surfaces
#[derive(Debug, Clone, Default)]
pub struct RadiationModel {
    surfaces: Vec<Surface>,
    /// Cached view factors; `None` until computed or after a surface is added
    view_factors: Option<DMatrix<f64>>,
    /// Smoke extinction coefficient κ (1/m)
    smoke_optical_thickness: f64,
}

impl RadiationModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all surfaces, drop cached view factors and clear the smoke.
    pub fn reset(&mut self) {
        self.surfaces.clear();
        self.view_factors = None;
        self.smoke_optical_thickness = 0.0;
    }

    /// Add a surface and return its id.
    ///
    /// Invalidates the cached view factors.
    pub fn add_surface(&mut self, surface: Surface) -> Result<usize> {
        surface.validate()?;
        self.surfaces.push(surface);
        self.view_factors = None;
        Ok(self.surfaces.len() - 1)
    }

    pub fn surface(&self, id: usize) -> Result<&Surface> {
        self.surfaces
            .get(id)
            .ok_or_else(|| EngineError::out_of_range("surface", id, self.surfaces.len()))
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    fn surface_mut(&mut self, id: usize) -> Result<&mut Surface> {
        let len = self.surfaces.len();
        self.surfaces
            .get_mut(id)
            .ok_or_else(|| EngineError::out_of_range("surface", id, len))
    }

    pub fn set_surface_temperature(&mut self, id: usize, temperature_k: f64) -> Result<()> {
        check_positive("temperature_k", temperature_k)?;
        self.surface_mut(id)?.temperature_k = temperature_k;
        Ok(())
    }

    pub fn set_surface_emissivity(&mut self, id: usize, emissivity: f64) -> Result<()> {
        check_unit_interval("emissivity", emissivity)?;
        self.surface_mut(id)?.emissivity = emissivity;
        Ok(())
    }

    /// Compute and cache the view factor matrix. O(n²).
    pub fn calculate_view_factors(&mut self) {
        let n = self.surfaces.len();
        let total_area: f64 = self.surfaces.iter().map(|s| s.area_m2).sum();

        let mut f = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            let other_area = total_area - self.surfaces[i].area_m2;
            if other_area <= 0.0 {
                continue;
            }
            for j in 0..n {
                if i != j {
                    f[(i, j)] = self.surfaces[j].area_m2 / other_area;
                }
            }
        }

        self.apply_reciprocity(&mut f);
        debug!("View factors recomputed for {} surfaces", n);
        self.view_factors = Some(f);
    }

    /// Impose `F_ij·A_i = F_ji·A_j` on every unordered pair.
    ///
    /// The conservative (smaller) raw factor becomes the outgoing factor of
    /// the smaller surface; the larger surface's factor follows from the area
    /// ratio and therefore never exceeds it.
    fn apply_reciprocity(&self, f: &mut DMatrix<f64>) {
        let n = self.surfaces.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (small, large) = if self.surfaces[i].area_m2 <= self.surfaces[j].area_m2 {
                    (i, j)
                } else {
                    (j, i)
                };
                let a_small = self.surfaces[small].area_m2;
                let a_large = self.surfaces[large].area_m2;

                let conservative = f[(i, j)].min(f[(j, i)]);
                f[(small, large)] = conservative;
                f[(large, small)] = conservative * a_small / a_large;
            }
        }
    }

    pub fn is_view_factors_calculated(&self) -> bool {
        self.view_factors.is_some()
    }

    fn view_factor_matrix(&self) -> Result<&DMatrix<f64>> {
        self.view_factors
            .as_ref()
            .ok_or_else(|| EngineError::illegal_state("view factors have not been calculated"))
    }

    fn check_id(&self, id: usize) -> Result<()> {
        if id < self.surfaces.len() {
            Ok(())
        } else {
            Err(EngineError::out_of_range("surface", id, self.surfaces.len()))
        }
    }

    /// View factor from surface `from` to surface `to`
    pub fn view_factor(&self, from: usize, to: usize) -> Result<f64> {
        let f = self.view_factor_matrix()?;
        self.check_id(from)?;
        self.check_id(to)?;
        Ok(f[(from, to)])
    }

    /// Radiative heat flow from surface `from` to surface `to` (W)
    ///
    /// Positive when `from` is hotter. Attenuated by smoke over the default
    /// 1 m beam length.
    pub fn radiative_heat_flux(&self, from: usize, to: usize) -> Result<f64> {
        let f = self.view_factor_matrix()?;
        self.check_id(from)?;
        self.check_id(to)?;
        Ok(self.pair_flux(f, from, to, self.attenuation(DEFAULT_BEAM_LENGTH_M)))
    }

    #[inline]
    fn pair_flux(&self, f: &DMatrix<f64>, from: usize, to: usize, tau: f64) -> f64 {
        let s_from = &self.surfaces[from];
        let s_to = &self.surfaces[to];
        f[(from, to)]
            * s_from.emissivity
            * STEFAN_BOLTZMANN
            * s_from.area_m2
            * (s_from.temperature_k.powi(4) - s_to.temperature_k.powi(4))
            * tau
    }

    /// Net radiative loss of a surface: `Σ_j (Q_ij − Q_ji)` (W)
    pub fn radiative_heat_exchange(&self, id: usize) -> Result<f64> {
        let f = self.view_factor_matrix()?;
        self.check_id(id)?;
        let tau = self.attenuation(DEFAULT_BEAM_LENGTH_M);
        Ok((0..self.surfaces.len())
            .filter(|&j| j != id)
            .map(|j| self.pair_flux(f, id, j, tau) - self.pair_flux(f, j, id, tau))
            .sum())
    }

    /// Total emissive power of every surface (W); needs no view factors
    pub fn total_radiated_power(&self) -> f64 {
        self.surfaces.iter().map(Surface::emissive_power_w).sum()
    }

    /// Set the smoke extinction coefficient κ (1/m).
    pub fn set_smoke_optical_thickness(&mut self, kappa: f64) -> Result<()> {
        if !kappa.is_finite() || kappa < 0.0 {
            return Err(EngineError::invalid_argument(
                "optical_thickness",
                format!("must be finite and non-negative, got {kappa}"),
            ));
        }
        self.smoke_optical_thickness = kappa;
        Ok(())
    }

    pub fn smoke_optical_thickness(&self) -> f64 {
        self.smoke_optical_thickness
    }

    /// Beer-Lambert transmissivity over `distance_m`.
    pub fn transmissivity(&self, distance_m: f64) -> Result<f64> {
        if !distance_m.is_finite() || distance_m < 0.0 {
            return Err(EngineError::invalid_argument(
                "distance_m",
                format!("must be finite and non-negative, got {distance_m}"),
            ));
        }
        Ok(self.attenuation(distance_m))
    }

    #[inline]
    fn attenuation(&self, distance_m: f64) -> f64 {
        (-self.smoke_optical_thickness * distance_m)
            .clamp(MIN_ATTENUATION_EXPONENT, 0.0)
            .exp()
    }

    /// Radiation arriving in `zone_id` from surfaces outside it (W).
    ///
    /// One-directional: the reverse flow is not subtracted.
    pub fn radiative_heat_to_zone(&self, zone_id: i32) -> Result<f64> {
        let f = self.view_factor_matrix()?;
        let tau = self.attenuation(DEFAULT_BEAM_LENGTH_M);
        let mut q = 0.0;
        for (i, source) in self.surfaces.iter().enumerate() {
            if source.zone_id == zone_id {
                continue;
            }
            for (j, target) in self.surfaces.iter().enumerate() {
                if target.zone_id == zone_id {
                    q += self.pair_flux(f, i, j, tau);
                }
            }
        }
        Ok(q)
    }

    /// Incoming radiation for every zone id that has at least one surface
    pub fn radiative_heat_by_zone(&self) -> Result<FxHashMap<i32, f64>> {
        let mut by_zone = FxHashMap::default();
        for surface in &self.surfaces {
            if !by_zone.contains_key(&surface.zone_id) {
                by_zone.insert(surface.zone_id, self.radiative_heat_to_zone(surface.zone_id)?);
            }
        }
        Ok(by_zone)
    }

    /// Push zone temperatures onto surfaces.
    ///
    /// `zone_ids[i]` selects the entry of `zone_temperatures_k` for surface
    /// `i`. Ids outside the temperature list and non-positive temperatures
    /// leave the surface unchanged.
    pub fn update_surface_temperatures_from_zones(
        &mut self,
        zone_temperatures_k: &[f64],
        zone_ids: &[i32],
    ) -> Result<()> {
        if zone_ids.len() != self.surfaces.len() {
            return Err(EngineError::invalid_argument(
                "zone_ids",
                format!(
                    "length {} does not match surface count {}",
                    zone_ids.len(),
                    self.surfaces.len()
                ),
            ));
        }

        for (surface, &zone_id) in self.surfaces.iter_mut().zip(zone_ids) {
            let Ok(idx) = usize::try_from(zone_id) else {
                continue;
            };
            if let Some(&t) = zone_temperatures_k.get(idx) {
                if is_finite_positive(t) {
                    surface.temperature_k = t;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hot_and_cold() -> RadiationModel {
        let mut model = RadiationModel::new();
        model.add_surface(Surface::new(10.0, 400.0, 0.9, 0.9, 0)).unwrap();
        model.add_surface(Surface::new(50.0, 300.0, 0.9, 0.9, 1)).unwrap();
        model.calculate_view_factors();
        model
    }

    #[test]
    fn test_hot_surface_radiates_to_cold() {
        let model = hot_and_cold();
        let q01 = model.radiative_heat_flux(0, 1).unwrap();
        let q10 = model.radiative_heat_flux(1, 0).unwrap();
        assert!(q01 > 0.0);
        assert!(q10 < q01);
    }

    #[test]
    fn test_two_surface_view_factors() {
        let model = hot_and_cold();
        assert_relative_eq!(model.view_factor(0, 1).unwrap(), 1.0);
        assert_relative_eq!(model.view_factor(1, 0).unwrap(), 0.2);
        assert_eq!(model.view_factor(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_reciprocity_holds_for_uneven_areas() {
        let mut model = RadiationModel::new();
        for area in [3.0, 40.0, 7.5, 12.0, 0.5] {
            model.add_surface(Surface::new(area, 350.0, 0.8, 0.8, 0)).unwrap();
        }
        model.calculate_view_factors();

        let n = model.surface_count();
        for i in 0..n {
            for j in 0..n {
                let a_i = model.surface(i).unwrap().area_m2;
                let a_j = model.surface(j).unwrap().area_m2;
                let fij = model.view_factor(i, j).unwrap();
                let fji = model.view_factor(j, i).unwrap();
                assert_relative_eq!(fij * a_i, fji * a_j, max_relative = 1e-12);
                assert!((0.0..=1.0).contains(&fij));
            }
        }
    }

    #[test]
    fn test_queries_require_view_factors() {
        let mut model = RadiationModel::new();
        model.add_surface(Surface::default()).unwrap();
        model.add_surface(Surface::default()).unwrap();
        assert!(matches!(
            model.view_factor(0, 1),
            Err(EngineError::IllegalState(_))
        ));
        assert!(matches!(
            model.radiative_heat_flux(0, 1),
            Err(EngineError::IllegalState(_))
        ));
        assert!(matches!(
            model.radiative_heat_exchange(0),
            Err(EngineError::IllegalState(_))
        ));

        model.calculate_view_factors();
        assert!(model.is_view_factors_calculated());
        assert!(matches!(
            model.view_factor(0, 2),
            Err(EngineError::OutOfRange { .. })
        ));

        // Adding a surface invalidates the cache
        model.add_surface(Surface::default()).unwrap();
        assert!(!model.is_view_factors_calculated());
    }

    #[test]
    fn test_surface_validation() {
        let mut model = RadiationModel::new();
        assert!(model.add_surface(Surface::new(0.0, 300.0, 0.9, 0.9, 0)).is_err());
        assert!(model.add_surface(Surface::new(1.0, -1.0, 0.9, 0.9, 0)).is_err());
        assert!(model.add_surface(Surface::new(1.0, 300.0, 1.1, 0.9, 0)).is_err());
        assert!(model.add_surface(Surface::new(1.0, 300.0, 0.9, -0.1, 0)).is_err());
        assert_eq!(model.surface_count(), 0);

        let id = model.add_surface(Surface::default()).unwrap();
        assert!(model.set_surface_emissivity(id, 2.0).is_err());
        assert!(model.set_surface_temperature(id, 0.0).is_err());
        assert!(model.set_surface_temperature(5, 300.0).is_err());
    }

    #[test]
    fn test_smoke_attenuates_flux() {
        let mut model = hot_and_cold();
        let clear = model.radiative_heat_flux(0, 1).unwrap();
        model.set_smoke_optical_thickness(0.5).unwrap();
        let smoky = model.radiative_heat_flux(0, 1).unwrap();
        assert_relative_eq!(smoky, clear * (-0.5f64).exp(), max_relative = 1e-12);

        assert!(model.set_smoke_optical_thickness(-1.0).is_err());
        assert!(model.transmissivity(-1.0).is_err());
        assert_relative_eq!(model.transmissivity(0.0).unwrap(), 1.0);

        // Exponent clamp keeps a dense layer finite and non-zero
        model.set_smoke_optical_thickness(1e6).unwrap();
        assert_relative_eq!(model.transmissivity(1.0).unwrap(), (-100.0f64).exp());
    }

    #[test]
    fn test_net_exchange_and_zone_heat() {
        let model = hot_and_cold();
        let q01 = model.radiative_heat_flux(0, 1).unwrap();
        let q10 = model.radiative_heat_flux(1, 0).unwrap();
        assert_relative_eq!(model.radiative_heat_exchange(0).unwrap(), q01 - q10);

        assert_relative_eq!(model.radiative_heat_to_zone(1).unwrap(), q01);
        let by_zone = model.radiative_heat_by_zone().unwrap();
        assert_eq!(by_zone.len(), 2);
        assert_relative_eq!(by_zone[&0], q10);
        assert_relative_eq!(model.radiative_heat_to_zone(7).unwrap(), 0.0);
    }

    #[test]
    fn test_total_radiated_power() {
        let model = hot_and_cold();
        let expected = 0.9 * STEFAN_BOLTZMANN * (10.0 * 400f64.powi(4) + 50.0 * 300f64.powi(4));
        assert_relative_eq!(model.total_radiated_power(), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_zone_temperature_push() {
        let mut model = hot_and_cold();
        assert!(model
            .update_surface_temperatures_from_zones(&[500.0], &[0])
            .is_err());

        model
            .update_surface_temperatures_from_zones(&[500.0, 320.0], &[1, 5])
            .unwrap();
        assert_eq!(model.surface(0).unwrap().temperature_k, 320.0);
        assert_eq!(model.surface(1).unwrap().temperature_k, 300.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut model = hot_and_cold();
        model.set_smoke_optical_thickness(1.0).unwrap();
        model.reset();
        assert_eq!(model.surface_count(), 0);
        assert!(!model.is_view_factors_calculated());
        assert_eq!(model.smoke_optical_thickness(), 0.0);
        assert_eq!(model.total_radiated_power(), 0.0);
    }
}
