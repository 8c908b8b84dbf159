//! Single-step combustion kinetics with Arrhenius rates
//!
//! Implements:
//! - Arrhenius rate `A·exp(-Ea/(R·T))·[fuel]^a·[O2]^b`
//! - Exponential inhibition by a suppression agent, `exp(-k·c_inhib)`
//! - Stoichiometric limiting by available fuel and O2
//! - A post-ignition pilot floor so kinetics cannot stall at ambient bulk temperature
//!
//! Stateless: [`Chemistry::react`] borrows the caller's species inventory and
//! mutates it in place. Invalid inputs produce a zero-effect [`ReactionResult`].
//!
//! # References
//! - Westbrook & Dryer (1981), simplified reaction mechanisms for hydrocarbon fuels
//! - Drysdale (2011), "An Introduction to Fire Dynamics", ch. 1

use serde::{Deserialize, Serialize};

use crate::constants::R_UNIVERSAL;
use crate::error::{EngineError, Result};
use crate::numeric::{is_finite_positive, non_negative};
use crate::species::ChemistryIndex;

/// Below this many moles a quantity is treated as absent
const TINY_MOL: f64 = 1e-15;

/// Lower clamp for the kinetic temperature (K)
const MIN_KINETIC_TEMP_K: f64 = 250.0;

/// Mixing-limited pilot floor on fuel consumption rate (1/s)
const PILOT_RATE_PER_S: f64 = 0.50;

/// Inhibition coefficient (1/(kg/m³)) in `exp(-k·c_inhib)`
const INHIBITION_COEFF: f64 = 5.0;

/// Kinetic and stoichiometric parameters of a single global reaction
///
/// `FUEL + ν_O2 O2 -> ν_CO2 CO2 + ν_H2O H2O`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombustionModel {
    /// Pre-exponential factor `A` (units depend on reaction orders)
    pub pre_exponential: f64,
    /// Activation energy `Ea` (J/mol)
    pub activation_energy_j_per_mol: f64,
    pub order_fuel: f64,
    pub order_o2: f64,
    /// Moles of O2 consumed per mole of fuel
    pub nu_o2: f64,
    /// Moles of CO2 formed per mole of fuel
    pub nu_co2: f64,
    /// Moles of H2O formed per mole of fuel
    pub nu_h2o: f64,
    /// Heat released per mole of fuel consumed (J/mol)
    pub heat_release_j_per_mol_fuel: f64,
}

impl CombustionModel {
    /// Build a model, rejecting negative or non-finite coefficients.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pre_exponential: f64,
        activation_energy_j_per_mol: f64,
        order_fuel: f64,
        order_o2: f64,
        nu_o2: f64,
        nu_co2: f64,
        nu_h2o: f64,
        heat_release_j_per_mol_fuel: f64,
    ) -> Result<Self> {
        let coefficients = [
            ("pre_exponential", pre_exponential),
            ("activation_energy_j_per_mol", activation_energy_j_per_mol),
            ("order_fuel", order_fuel),
            ("order_o2", order_o2),
            ("nu_o2", nu_o2),
            ("nu_co2", nu_co2),
            ("nu_h2o", nu_h2o),
            ("heat_release_j_per_mol_fuel", heat_release_j_per_mol_fuel),
        ];
        for (param, value) in coefficients {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::invalid_argument(
                    param,
                    format!("must be finite and non-negative, got {value}"),
                ));
            }
        }
        Ok(Self {
            pre_exponential,
            activation_energy_j_per_mol,
            order_fuel,
            order_o2,
            nu_o2,
            nu_co2,
            nu_h2o,
            heat_release_j_per_mol_fuel,
        })
    }

    /// Propane single-step global reaction: C3H8 + 5 O2 -> 3 CO2 + 4 H2O
    ///
    /// Westbrook & Dryer orders (0.1, 1.65) with `Ea` = 125.6 kJ/mol;
    /// heat of combustion 2.044 MJ/mol (lower heating value).
    pub fn propane() -> Self {
        Self {
            pre_exponential: 8.6e11 * 1e-6,
            activation_energy_j_per_mol: 125_600.0,
            order_fuel: 0.1,
            order_o2: 1.65,
            nu_o2: 5.0,
            nu_co2: 3.0,
            nu_h2o: 4.0,
            heat_release_j_per_mol_fuel: 2.044e6,
        }
    }
}

/// Species changes and heat release of one `react` call
///
/// Deltas are signed: consumption negative, formation positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactionResult {
    pub d_mol_fuel: f64,
    pub d_mol_o2: f64,
    pub d_mol_co2: f64,
    pub d_mol_h2o: f64,
    /// Heat release rate (W), positive means heat generation
    pub heat_release_rate_w: f64,
}

impl ReactionResult {
    /// Moles of fuel burnt (the single limiting quantity)
    #[inline]
    pub fn fuel_consumed_mol(&self) -> f64 {
        -self.d_mol_fuel
    }
}

/// Stateless kinetics evaluator bound to a species layout and a reaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chemistry {
    index: ChemistryIndex,
    model: CombustionModel,
}

impl Chemistry {
    pub fn new(index: ChemistryIndex, model: CombustionModel) -> Self {
        Self { index, model }
    }

    pub fn index(&self) -> ChemistryIndex {
        self.index
    }

    pub fn model(&self) -> &CombustionModel {
        &self.model
    }

    /// Advance the reaction by `dt` seconds in a well-mixed volume.
    ///
    /// # Arguments
    ///
    /// * `dt` - Timestep (s)
    /// * `temperature_k` - Bulk gas temperature (K)
    /// * `ignition_temp_floor_k` - Kinetics-only temperature floor while an ignition
    ///   kernel is active; `<= 0` means no kernel
    /// * `volume_m3` - Reacting volume (m³)
    /// * `n_mol` - Species inventory (mol), updated in place
    /// * `inhibitor_kg_per_m3` - Suppression agent concentration
    ///
    /// # Returns
    ///
    /// The species deltas and heat release rate. Any invalid input (non-positive
    /// `dt` or volume, non-finite temperature, unresolvable species index) yields
    /// `ReactionResult::default()` and leaves `n_mol` untouched.
    pub fn react(
        &self,
        dt: f64,
        temperature_k: f64,
        ignition_temp_floor_k: f64,
        volume_m3: f64,
        n_mol: &mut [f64],
        inhibitor_kg_per_m3: f64,
    ) -> ReactionResult {
        let none = ReactionResult::default();

        if !is_finite_positive(dt) || !is_finite_positive(volume_m3) || !temperature_k.is_finite()
        {
            return none;
        }
        let Some(idx) = self.index.resolve(n_mol.len()) else {
            return none;
        };

        let n_fuel = non_negative(n_mol[idx.fuel]);
        let n_o2 = non_negative(n_mol[idx.o2]);
        if n_fuel <= TINY_MOL || n_o2 <= TINY_MOL {
            return none;
        }

        // Concentrations (mol/m³)
        let c_fuel = n_fuel / volume_m3;
        let c_o2 = n_o2 / volume_m3;

        // The ignition floor only feeds the Arrhenius term; bulk temperature is untouched.
        let floor_k = if is_finite_positive(ignition_temp_floor_k) {
            ignition_temp_floor_k
        } else {
            0.0
        };
        let t_kinetic = MIN_KINETIC_TEMP_K.max(temperature_k.max(floor_k));

        let mut k_t = self.model.pre_exponential
            * (-self.model.activation_energy_j_per_mol / (R_UNIVERSAL * t_kinetic)).exp();
        if !k_t.is_finite() || k_t < 0.0 {
            k_t = 0.0;
        }

        let inhibition = (-INHIBITION_COEFF * non_negative(inhibitor_kg_per_m3)).exp();

        // Fuel consumption rate (mol/(m³·s))
        let mut r_fuel = k_t
            * c_fuel.powf(self.model.order_fuel)
            * c_o2.powf(self.model.order_o2)
            * inhibition;

        // Pilot floor: mixing-limited, vanishes as O2 depletes
        if floor_k > 0.0 {
            let o2_saturation = c_o2 / (c_o2 + 1.0);
            let r_pilot = PILOT_RATE_PER_S * c_fuel * o2_saturation * inhibition;
            if r_pilot.is_finite() && r_pilot > 0.0 {
                r_fuel = r_fuel.max(r_pilot);
            }
        }

        if !r_fuel.is_finite() || r_fuel <= 0.0 {
            return none;
        }

        let nu_o2 = non_negative(self.model.nu_o2);
        let nu_co2 = non_negative(self.model.nu_co2);
        let nu_h2o = non_negative(self.model.nu_h2o);

        let max_by_o2 = if nu_o2 > TINY_MOL { n_o2 / nu_o2 } else { 0.0 };
        let kinetic_demand = r_fuel * volume_m3 * dt;
        let fuel_consumed = non_negative(kinetic_demand.min(n_fuel).min(max_by_o2));

        if fuel_consumed <= TINY_MOL {
            return none;
        }

        let o2_consumed = nu_o2 * fuel_consumed;
        let co2_formed = nu_co2 * fuel_consumed;
        let h2o_formed = nu_h2o * fuel_consumed;

        n_mol[idx.fuel] = non_negative(n_mol[idx.fuel] - fuel_consumed);
        n_mol[idx.o2] = non_negative(n_mol[idx.o2] - o2_consumed);
        n_mol[idx.co2] = non_negative(n_mol[idx.co2] + co2_formed);
        n_mol[idx.h2o] = non_negative(n_mol[idx.h2o] + h2o_formed);

        let heat_j = self.model.heat_release_j_per_mol_fuel * fuel_consumed;

        ReactionResult {
            d_mol_fuel: -fuel_consumed,
            d_mol_o2: -o2_consumed,
            d_mol_co2: co2_formed,
            d_mol_h2o: h2o_formed,
            heat_release_rate_w: if heat_j.is_finite() { heat_j / dt } else { 0.0 },
        }
    }
}
