//! Multi-compartment network
//!
//! Connects [`ThreeZoneModel`] compartments through [`Opening`]s and drives
//! pressure-based inter-compartment flow.
//!
//! # Step sequence
//!
//! 1. Pressure of each compartment from its representative (upper) zone:
//!    `P = P_atm + ρ·g·h + 0.1·P_atm·(T/298.15 − 1)`, clamped to
//!    `[0.95, 1.10]·P_atm`
//! 2. Mass-flow matrix rebuilt from every opening:
//!    - Bernoulli: `ṁ = Cd·A·ρ_avg·sqrt(2|ΔP|/ρ_avg)`, high to low pressure
//!    - Stack effect: `ṁ += 0.5·Cd·A·ρ_avg·sqrt(2g·h·|ΔT|/T_avg)`, hot to cold
//! 3. Mass and enthalpy in/out per compartment, an exchange-derived ACH and an
//!    effective HRR (commanded HRR plus net enthalpy exchange), then every
//!    compartment model is stepped with the effective HRR and the baseline
//!    wall cooling.
//!
//! Flows are reported but mass is not moved between compartment inventories;
//! exchange acts on each compartment through its HRR and ventilation inputs.
//! Enthalpy carried by a flow is `cp·T·m` with the temperature of the source
//! compartment's upper zone.

mod exchange;
mod opening;

pub use exchange::{ExchangeSummary, EXCHANGE_CSV_HEADER};
pub use opening::{Opening, DEFAULT_DISCHARGE_COEFFICIENT};

use std::io;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{ATM_PRESSURE, CP_AIR, G_ACCEL, PRESSURE_REFERENCE_K, SECONDS_PER_HOUR};
use crate::error::{check_dt, EngineError, Result};
use crate::numeric::{is_finite_positive, non_negative, safe_div};
use crate::zones::ThreeZoneModel;

/// Lower pressure clamp as a fraction of atmospheric
const MIN_PRESSURE_FRACTION: f64 = 0.95;
/// Upper pressure clamp as a fraction of atmospheric
const MAX_PRESSURE_FRACTION: f64 = 1.10;
/// Share of atmospheric pressure per unit relative temperature rise
const THERMAL_EXPANSION_FACTOR: f64 = 0.1;
/// Stack-effect flow relative to a full Bernoulli jet
const STACK_FLOW_FACTOR: f64 = 0.5;

/// Network-wide drive parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkParams {
    /// Wall heat loss applied to every compartment each step (W)
    pub baseline_cooling_w: f64,
    /// Background ventilation of every compartment (1/h)
    pub baseline_ach: f64,
    /// Pressure differences at or below this are treated as noise (Pa)
    pub pressure_noise_threshold_pa: f64,
    /// Temperature difference above which stack flow is added (K)
    pub stack_threshold_k: f64,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            baseline_cooling_w: 5000.0,
            baseline_ach: 0.5,
            pressure_noise_threshold_pa: 0.01,
            stack_threshold_k: 10.0,
        }
    }
}

impl NetworkParams {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("baseline_cooling_w", self.baseline_cooling_w),
            ("baseline_ach", self.baseline_ach),
            ("pressure_noise_threshold_pa", self.pressure_noise_threshold_pa),
            ("stack_threshold_k", self.stack_threshold_k),
        ];
        for (param, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::invalid_argument(
                    param,
                    format!("must be finite and non-negative, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

/// Per-compartment inputs for the zone step
#[derive(Debug, Clone, Copy)]
struct ZoneDrive {
    heat_release_w: f64,
    cooling_w: f64,
    ach: f64,
}

/// Compartments connected by openings
#[derive(Debug, Clone)]
pub struct CompartmentNetwork {
    compartments: Vec<ThreeZoneModel>,
    openings: Vec<Opening>,
    /// `[i, j]` = current mass flow from i to j (kg/s)
    mass_flow: DMatrix<f64>,
    pressures: Vec<f64>,
    last_exchange: Vec<ExchangeSummary>,
    params: NetworkParams,
}

impl Default for CompartmentNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl CompartmentNetwork {
    pub fn new() -> Self {
        Self {
            compartments: Vec::new(),
            openings: Vec::new(),
            mass_flow: DMatrix::zeros(0, 0),
            pressures: Vec::new(),
            last_exchange: Vec::new(),
            params: NetworkParams::default(),
        }
    }

    /// Replace the drive parameters.
    pub fn with_params(mut self, params: NetworkParams) -> Result<Self> {
        params.validate()?;
        self.params = params;
        Ok(self)
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    /// Remove every compartment and opening.
    pub fn reset(&mut self) {
        self.compartments.clear();
        self.openings.clear();
        self.mass_flow = DMatrix::zeros(0, 0);
        self.pressures.clear();
        self.last_exchange.clear();
    }

    /// Append a compartment and return its id.
    ///
    /// Its pressure reads atmospheric until the next step.
    pub fn add_compartment(&mut self, compartment: ThreeZoneModel) -> usize {
        self.compartments.push(compartment);
        let n = self.compartments.len();
        self.mass_flow = DMatrix::zeros(n, n);
        self.pressures.push(ATM_PRESSURE);
        info!(
            "Added compartment {} ({} compartments, {} openings)",
            n - 1,
            n,
            self.openings.len()
        );
        n - 1
    }

    /// Add an opening between two existing, distinct compartments and return its id.
    pub fn add_opening(&mut self, opening: Opening) -> Result<usize> {
        opening.validate(self.compartments.len())?;
        self.openings.push(opening);
        info!(
            "Added opening {} -> {} ({:.2} m², Cd {:.2})",
            opening.from,
            opening.to,
            opening.area_m2(),
            opening.discharge_coefficient
        );
        Ok(self.openings.len() - 1)
    }

    /// Advance the whole network by `dt` seconds.
    ///
    /// `heat_release_w[i]` is the commanded HRR of compartment `i` (W).
    pub fn step(&mut self, dt: f64, heat_release_w: &[f64]) -> Result<()> {
        check_dt(dt)?;
        if heat_release_w.len() != self.compartments.len() {
            return Err(EngineError::invalid_argument(
                "heat_release_w",
                format!(
                    "length {} does not match compartment count {}",
                    heat_release_w.len(),
                    self.compartments.len()
                ),
            ));
        }

        self.calculate_pressures();
        self.calculate_mass_flow();

        let drives = self.calculate_exchange(dt, heat_release_w);
        self.step_compartments(dt, &drives)?;

        debug!(
            "Network step dt={:.3}s: {} compartments, total flow {:.4} kg/s",
            dt,
            self.compartments.len(),
            self.mass_flow.sum()
        );
        Ok(())
    }

    fn calculate_pressures(&mut self) {
        let p_min = ATM_PRESSURE * MIN_PRESSURE_FRACTION;
        let p_max = ATM_PRESSURE * MAX_PRESSURE_FRACTION;

        for (pressure, compartment) in self.pressures.iter_mut().zip(&self.compartments) {
            let zone = compartment.representative_zone();
            let hydrostatic = zone.density_kg_m3() * G_ACCEL * zone.height_m();
            let thermal = ATM_PRESSURE
                * (zone.temperature_k() / PRESSURE_REFERENCE_K - 1.0)
                * THERMAL_EXPANSION_FACTOR;
            let p = ATM_PRESSURE + hydrostatic + thermal;
            *pressure = if p.is_finite() {
                p.clamp(p_min, p_max)
            } else {
                ATM_PRESSURE
            };
        }
    }

    fn calculate_mass_flow(&mut self) {
        self.mass_flow.fill(0.0);

        for opening in &self.openings {
            let (i, j) = (opening.from, opening.to);
            let delta_p = self.pressures[i] - self.pressures[j];
            if delta_p.abs() <= self.params.pressure_noise_threshold_pa {
                continue;
            }

            let rho_avg = self.average_density(i, j);
            if !is_finite_positive(rho_avg) {
                continue;
            }
            let velocity = (2.0 * delta_p.abs() / rho_avg).sqrt();
            let mdot = opening.discharge_coefficient * opening.area_m2() * rho_avg * velocity;
            if delta_p > 0.0 {
                self.mass_flow[(i, j)] += mdot;
            } else {
                self.mass_flow[(j, i)] += mdot;
            }
        }

        // Stack effect, hot to cold
        for opening in &self.openings {
            let (i, j) = (opening.from, opening.to);
            let t_i = self.compartments[i].representative_zone().temperature_k();
            let t_j = self.compartments[j].representative_zone().temperature_k();
            let delta_t = t_i - t_j;
            if delta_t.abs() <= self.params.stack_threshold_k {
                continue;
            }

            let rho_avg = self.average_density(i, j);
            let t_avg = 0.5 * (t_i + t_j);
            let v_buoyancy =
                safe_div(2.0 * G_ACCEL * opening.height_m * delta_t.abs(), t_avg, 0.0).sqrt();
            let mdot = non_negative(
                STACK_FLOW_FACTOR
                    * opening.discharge_coefficient
                    * opening.area_m2()
                    * rho_avg
                    * v_buoyancy,
            );
            if delta_t > 0.0 {
                self.mass_flow[(i, j)] += mdot;
            } else {
                self.mass_flow[(j, i)] += mdot;
            }
        }

    }

    fn average_density(&self, i: usize, j: usize) -> f64 {
        0.5 * (self.compartments[i].representative_zone().density_kg_m3()
            + self.compartments[j].representative_zone().density_kg_m3())
    }

    /// Fill `last_exchange` and return the zone drives for this step.
    fn calculate_exchange(&mut self, dt: f64, heat_release_w: &[f64]) -> Vec<ZoneDrive> {
        let n = self.compartments.len();
        let mut summaries = Vec::with_capacity(n);
        let mut drives = Vec::with_capacity(n);

        for i in 0..n {
            let mut summary = ExchangeSummary::default();
            for j in (0..n).filter(|&j| j != i) {
                let flow_in = self.mass_flow[(j, i)];
                if flow_in > 0.0 {
                    summary.mass_in_kg += flow_in * dt;
                    summary.enthalpy_in_j += CP_AIR * self.upper_temperature_k(j) * flow_in * dt;
                }
                let flow_out = self.mass_flow[(i, j)];
                if flow_out > 0.0 {
                    summary.mass_out_kg += flow_out * dt;
                    summary.enthalpy_out_j += CP_AIR * self.upper_temperature_k(i) * flow_out * dt;
                }
            }

            let compartment = &self.compartments[i];
            let volume = compartment.total_volume_m3();
            let rho_avg = safe_div(compartment.total_mass_kg(), volume, 0.0);
            let net_outflow_kg_s = non_negative(summary.mass_out_kg - summary.mass_in_kg) / dt;
            let volume_flow_m3_s = safe_div(net_outflow_kg_s, rho_avg, 0.0);
            let exchange_ach = safe_div(volume_flow_m3_s, volume, 0.0) * SECONDS_PER_HOUR;

            summary.ach = self.params.baseline_ach + exchange_ach;
            summary.net_exchange_w = (summary.enthalpy_in_j - summary.enthalpy_out_j) / dt;

            // Net loss is not converted to cooling; the zone model drops non-positive HRR
            drives.push(ZoneDrive {
                heat_release_w: heat_release_w[i] + summary.net_exchange_w,
                cooling_w: self.params.baseline_cooling_w,
                ach: summary.ach,
            });
            summaries.push(summary);
        }

        self.last_exchange = summaries;
        drives
    }

    fn upper_temperature_k(&self, id: usize) -> f64 {
        self.compartments[id].representative_zone().temperature_k()
    }

    #[cfg(not(feature = "parallel"))]
    fn step_compartments(&mut self, dt: f64, drives: &[ZoneDrive]) -> Result<()> {
        for (compartment, drive) in self.compartments.iter_mut().zip(drives) {
            compartment.step(dt, drive.heat_release_w, drive.cooling_w, drive.ach)?;
        }
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn step_compartments(&mut self, dt: f64, drives: &[ZoneDrive]) -> Result<()> {
        use rayon::prelude::*;

        self.compartments
            .par_iter_mut()
            .zip(drives.par_iter())
            .try_for_each(|(compartment, drive)| {
                compartment.step(dt, drive.heat_release_w, drive.cooling_w, drive.ach)
            })
    }

    fn check_compartment(&self, id: usize) -> Result<()> {
        if id < self.compartments.len() {
            Ok(())
        } else {
            Err(EngineError::out_of_range(
                "compartment",
                id,
                self.compartments.len(),
            ))
        }
    }

    pub fn compartment(&self, id: usize) -> Result<&ThreeZoneModel> {
        self.check_compartment(id)?;
        Ok(&self.compartments[id])
    }

    pub fn compartments(&self) -> &[ThreeZoneModel] {
        &self.compartments
    }

    pub fn compartment_count(&self) -> usize {
        self.compartments.len()
    }

    pub fn openings(&self) -> &[Opening] {
        &self.openings
    }

    /// Mass flow from `from` to `to` during the last step (kg/s)
    pub fn inter_compartment_flow(&self, from: usize, to: usize) -> Result<f64> {
        self.check_compartment(from)?;
        self.check_compartment(to)?;
        Ok(self.mass_flow[(from, to)])
    }

    /// Pressure used for the last step (Pa)
    pub fn compartment_pressure(&self, id: usize) -> Result<f64> {
        self.check_compartment(id)?;
        Ok(self.pressures[id])
    }

    pub fn pressures(&self) -> &[f64] {
        &self.pressures
    }

    pub fn mass_flow(&self) -> &DMatrix<f64> {
        &self.mass_flow
    }

    /// Exchange summaries from the last step; empty before the first step
    pub fn last_exchange(&self) -> &[ExchangeSummary] {
        &self.last_exchange
    }

    /// Exchange summary of one compartment; zeros before its first step
    pub fn exchange_summary(&self, id: usize) -> Result<ExchangeSummary> {
        self.check_compartment(id)?;
        Ok(self.last_exchange.get(id).copied().unwrap_or_default())
    }

    /// Write the last step's exchange summaries as CSV.
    ///
    /// Columns: `time_s,compartment_id,pressure_Pa,mass_in_kg,mass_out_kg,ACH,
    /// net_exchange_W,enthalpy_in_J,enthalpy_out_J`, six decimals.
    pub fn write_exchange_csv<W: io::Write>(&self, writer: &mut W, time_s: f64) -> io::Result<()> {
        exchange::write_exchange_csv(writer, time_s, &self.pressures, &self.last_exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::Zone;
    use approx::assert_relative_eq;

    fn room(height_m: f64) -> ThreeZoneModel {
        let mut model = ThreeZoneModel::new(height_m, 20.0, 2).unwrap();
        model.reset(293.15, 101325.0).unwrap();
        model
    }

    fn pair(h_a: f64, h_b: f64) -> CompartmentNetwork {
        let mut network = CompartmentNetwork::new();
        let a = network.add_compartment(room(h_a));
        let b = network.add_compartment(room(h_b));
        network.add_opening(Opening::new(a, b, 2.0, 0.9)).unwrap();
        network
    }

    #[test]
    fn test_equal_compartments_have_no_flow() {
        let mut network = pair(3.0, 3.0);
        network.step(1.0, &[0.0, 0.0]).unwrap();
        assert_eq!(network.inter_compartment_flow(0, 1).unwrap(), 0.0);
        assert_eq!(network.inter_compartment_flow(1, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_flow_goes_from_high_to_low_pressure() {
        // Taller room, taller hot layer, larger hydrostatic term
        let mut network = pair(4.0, 3.0);
        network.step(1.0, &[0.0, 0.0]).unwrap();
        assert!(network.compartment_pressure(0).unwrap() > network.compartment_pressure(1).unwrap());
        assert!(network.inter_compartment_flow(0, 1).unwrap() > 0.0);
        assert_eq!(network.inter_compartment_flow(1, 0).unwrap(), 0.0);

        // Reversing the opening's orientation does not change the direction
        let mut network = CompartmentNetwork::new();
        network.add_compartment(room(4.0));
        network.add_compartment(room(3.0));
        network.add_opening(Opening::new(1, 0, 2.0, 0.9)).unwrap();
        network.step(1.0, &[0.0, 0.0]).unwrap();
        assert!(network.inter_compartment_flow(0, 1).unwrap() > 0.0);
        assert_eq!(network.inter_compartment_flow(1, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_fire_room_heats_its_neighbour() {
        let mut network = pair(3.0, 3.0);
        network.step(1.0, &[200_000.0, 0.0]).unwrap();
        network.step(1.0, &[200_000.0, 0.0]).unwrap();

        // The fire room is now hotter and at higher pressure
        assert!(network.inter_compartment_flow(0, 1).unwrap() > 0.0);
        let summary = network.exchange_summary(1).unwrap();
        assert!(summary.mass_in_kg > 0.0);
        assert!(summary.enthalpy_in_j > 0.0);
        assert!(summary.net_exchange_w > 0.0);

        for _ in 0..28 {
            network.step(1.0, &[200_000.0, 0.0]).unwrap();
        }
        let neighbour = network.compartment(1).unwrap().upper_zone().temperature_k();
        assert!(neighbour > 303.15 + 5.0);
        for compartment in network.compartments() {
            for zone in compartment.zones() {
                let t = zone.temperature_k();
                assert!(t.is_finite() && (273.15..=5000.0).contains(&t));
            }
        }
    }

    #[test]
    fn test_door_flow_follows_bernoulli() {
        let mut network = pair(4.0, 3.0);
        let (tall, short) = (
            network.compartment(0).unwrap().upper_zone().clone(),
            network.compartment(1).unwrap().upper_zone().clone(),
        );
        let rho_avg = 0.5 * (tall.density_kg_m3() + short.density_kg_m3());
        let pressure = |zone: &Zone| {
            ATM_PRESSURE
                + zone.density_kg_m3() * G_ACCEL * zone.height_m()
                + ATM_PRESSURE * (zone.temperature_k() / PRESSURE_REFERENCE_K - 1.0)
                    * THERMAL_EXPANSION_FACTOR
        };
        let delta_p = pressure(&tall) - pressure(&short);
        assert_relative_eq!(delta_p, 3.5482, max_relative = 1e-4);

        network.step(1.0, &[0.0, 0.0]).unwrap();
        let expected = 0.65 * 1.8 * rho_avg * (2.0 * delta_p / rho_avg).sqrt();
        let flow = network.inter_compartment_flow(0, 1).unwrap();
        assert_relative_eq!(flow, expected, max_relative = 1e-9);
        // A 3.5 Pa head through a door moves more than a tenth of the hot layer
        assert!(flow > 0.1 * tall.mass_kg());
        assert_relative_eq!(flow, 3.42224, max_relative = 1e-4);
    }

    #[test]
    fn test_enthalpy_carried_at_source_upper_temperature() {
        let mut network = pair(4.0, 3.0);
        let t_source = network.compartment(0).unwrap().upper_zone().temperature_k();
        let t_sink = network.compartment(1).unwrap().upper_zone().temperature_k();
        assert_eq!(t_source, 303.15);
        network.step(1.0, &[0.0, 0.0]).unwrap();

        let received = network.exchange_summary(1).unwrap();
        assert!(received.mass_in_kg > 0.0);
        assert_relative_eq!(
            received.enthalpy_in_j,
            CP_AIR * t_source * received.mass_in_kg,
            max_relative = 1e-12
        );
        assert_relative_eq!(received.net_exchange_w, received.enthalpy_in_j);

        // The sink's upper zone took the full inflow enthalpy as heat
        let after = network.compartment(1).unwrap().upper_zone().temperature_k();
        assert!(after > t_sink + 10.0);

        let sent = network.exchange_summary(0).unwrap();
        assert_relative_eq!(sent.enthalpy_out_j, received.enthalpy_in_j, max_relative = 1e-12);
        assert!(sent.net_exchange_w < 0.0);
    }

    #[test]
    fn test_pressure_is_clamped() {
        let mut network = CompartmentNetwork::new();
        network.add_compartment(room(3.0));
        for _ in 0..20 {
            network.step(1.0, &[5.0e6]).unwrap();
        }
        let p = network.compartment_pressure(0).unwrap();
        assert!(p <= ATM_PRESSURE * MAX_PRESSURE_FRACTION + 1e-9);
        assert!(p >= ATM_PRESSURE * MIN_PRESSURE_FRACTION - 1e-9);
    }

    #[test]
    fn test_exchange_summary_without_openings() {
        let mut network = CompartmentNetwork::new();
        network.add_compartment(room(3.0));
        assert_eq!(network.exchange_summary(0).unwrap(), ExchangeSummary::default());

        network.step(0.5, &[1000.0]).unwrap();
        let summary = network.exchange_summary(0).unwrap();
        assert_relative_eq!(summary.ach, 0.5);
        assert_eq!(summary.mass_in_kg, 0.0);
        assert_eq!(summary.net_exchange_w, 0.0);
    }

    #[test]
    fn test_contract_violations() {
        let mut network = pair(3.0, 3.0);
        assert!(matches!(
            network.step(1.0, &[0.0]),
            Err(EngineError::InvalidArgument { .. })
        ));
        assert!(network.step(0.0, &[0.0, 0.0]).is_err());
        assert!(network.step(f64::NAN, &[0.0, 0.0]).is_err());

        assert!(matches!(
            network.add_opening(Opening::new(0, 5, 2.0, 1.0)),
            Err(EngineError::InvalidArgument { .. })
        ));
        assert!(matches!(
            network.compartment(2),
            Err(EngineError::OutOfRange { .. })
        ));
        assert!(network.inter_compartment_flow(0, 2).is_err());
        assert!(network.compartment_pressure(9).is_err());
    }

    #[test]
    fn test_params_validation() {
        let bad = NetworkParams {
            baseline_ach: -1.0,
            ..NetworkParams::default()
        };
        assert!(CompartmentNetwork::new().with_params(bad).is_err());
        assert!(CompartmentNetwork::new()
            .with_params(NetworkParams::default())
            .is_ok());
    }

    #[test]
    fn test_csv_export_after_step() {
        let mut network = pair(4.0, 3.0);
        network.step(1.0, &[0.0, 0.0]).unwrap();
        let mut out = Vec::new();
        network.write_exchange_csv(&mut out, 1.0).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], EXCHANGE_CSV_HEADER);
        assert!(lines[1].starts_with("1.000000,0,"));
        assert!(lines[2].starts_with("1.000000,1,"));
    }

    #[test]
    fn test_reset_clears_topology() {
        let mut network = pair(3.0, 3.0);
        network.step(1.0, &[0.0, 0.0]).unwrap();
        network.reset();
        assert_eq!(network.compartment_count(), 0);
        assert!(network.openings().is_empty());
        assert!(network.last_exchange().is_empty());
        assert_eq!(network.mass_flow().nrows(), 0);
        network.step(1.0, &[]).unwrap();
    }
}
