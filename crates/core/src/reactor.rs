//! Well-mixed single-zone reactor
//!
//! Owns a species inventory and one bulk temperature. Each step:
//! 1. Runs [`Chemistry::react`] on the owned inventory (the only source of combustion HRR)
//! 2. Computes heat loss to ambient (convection + Stefan-Boltzmann radiation)
//! 3. Integrates `dT = Q_net·dt / Cp_mix`, clamped to `[1 K, 5000 K]`
//!
//! Numeric failure never escapes a step: a degenerate heat capacity clamps the
//! temperature and exits, a non-finite temperature change relaxes to ambient,
//! and the inventory is sanitized on every path.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chemistry::{Chemistry, CombustionModel};
use crate::constants::STEFAN_BOLTZMANN;
use crate::error::{check_dt, check_positive, check_unit_interval, EngineError, Result};
use crate::numeric::{clamp_temperature, is_finite_positive, safe_div, sanitize_moles};
use crate::species::{ChemistryIndex, SpeciesTable};

/// Hard temperature floor (K)
pub const REACTOR_MIN_TEMP_K: f64 = 1.0;

/// Safety cap (K)
pub const REACTOR_MAX_TEMP_K: f64 = 5000.0;

/// Fallback ambient if the configured one is unusable (K)
const FALLBACK_AMBIENT_K: f64 = 295.15;

/// Geometry and heat-loss parameters of a reactor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactorConfig {
    /// Ambient temperature for heat loss and fail-safe relaxation (K)
    pub ambient_temperature_k: f64,
    /// Heat-loss surface area (m²)
    pub area_m2: f64,
    /// Convective coefficient (W/(m²·K))
    pub h_w_per_m2_k: f64,
    /// Surface emissivity (0-1)
    pub emissivity: f64,
    /// Reacting gas volume (m³)
    pub volume_m3: f64,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            ambient_temperature_k: FALLBACK_AMBIENT_K,
            area_m2: 10.0,
            h_w_per_m2_k: 10.0,
            emissivity: 0.9,
            volume_m3: 50.0,
        }
    }
}

impl ReactorConfig {
    pub fn validate(&self) -> Result<()> {
        check_positive("ambient_temperature_k", self.ambient_temperature_k)?;
        check_positive("area_m2", self.area_m2)?;
        check_positive("volume_m3", self.volume_m3)?;
        if !self.h_w_per_m2_k.is_finite() || self.h_w_per_m2_k < 0.0 {
            return Err(EngineError::invalid_argument(
                "h_w_per_m2_k",
                format!("must be finite and non-negative, got {}", self.h_w_per_m2_k),
            ));
        }
        check_unit_interval("emissivity", self.emissivity)
    }
}

/// Per-step external drivers of a reactor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactorInputs {
    /// Suppression agent concentration (kg/m³)
    pub inhibitor_kg_per_m3: f64,
    /// Extra heat removal (W); negative values add heat
    pub external_cooling_w: f64,
    /// Fraction of combustion heat coupled into the thermal state (0-1)
    pub combustion_heat_multiplier: f64,
    /// Kinetics-only ignition kernel temperature (K); `<= 0` means no kernel
    pub ignition_temp_floor_k: f64,
}

impl Default for ReactorInputs {
    fn default() -> Self {
        Self {
            inhibitor_kg_per_m3: 0.0,
            external_cooling_w: 0.0,
            combustion_heat_multiplier: 1.0,
            ignition_temp_floor_k: 0.0,
        }
    }
}

/// Well-mixed combustion reactor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reactor {
    config: ReactorConfig,
    species: SpeciesTable,
    chemistry: Chemistry,
    n_mol: Vec<f64>,
    gas_indices: Vec<usize>,
    temperature_k: f64,
}

impl Reactor {
    /// Create a reactor at ambient temperature with an empty inventory.
    ///
    /// The inventory is sized to `species` once and never resized.
    pub fn new(
        species: SpeciesTable,
        index: ChemistryIndex,
        model: CombustionModel,
        config: ReactorConfig,
    ) -> Result<Self> {
        config.validate()?;
        let n_mol = vec![0.0; species.len()];
        let gas_indices = species.gas_indices();
        debug!(
            "Reactor created: {} species, V={:.2} m³, A={:.2} m²",
            species.len(),
            config.volume_m3,
            config.area_m2
        );
        Ok(Self {
            temperature_k: config.ambient_temperature_k,
            config,
            species,
            chemistry: Chemistry::new(index, model),
            n_mol,
            gas_indices,
        })
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    pub fn species(&self) -> &SpeciesTable {
        &self.species
    }

    pub fn chemistry(&self) -> &Chemistry {
        &self.chemistry
    }

    /// Species inventory (mol), index-aligned to [`Reactor::species`]
    pub fn moles(&self) -> &[f64] {
        &self.n_mol
    }

    pub fn temperature_k(&self) -> f64 {
        self.temperature_k
    }

    pub fn set_temperature_k(&mut self, temperature_k: f64) -> Result<()> {
        check_positive("temperature_k", temperature_k)?;
        self.temperature_k = temperature_k.clamp(REACTOR_MIN_TEMP_K, REACTOR_MAX_TEMP_K);
        Ok(())
    }

    /// Add `dn` moles of species `i`. Out-of-range ids and non-finite deltas are
    /// ignored; the result is floored at zero.
    pub fn add_moles(&mut self, i: usize, dn: f64) {
        if !dn.is_finite() {
            return;
        }
        if let Some(n) = self.n_mol.get_mut(i) {
            let updated = *n + dn;
            *n = if updated.is_finite() && updated > 0.0 {
                updated
            } else {
                0.0
            };
        }
    }

    pub fn total_gas_moles(&self) -> f64 {
        self.gas_indices
            .iter()
            .map(|&i| self.n_mol[i])
            .filter(|n| n.is_finite() && *n > 0.0)
            .sum()
    }

    /// Gas-phase mole fraction of species `i`; 0 for condensed, unknown or degenerate cases.
    pub fn gas_mole_fraction(&self, i: usize) -> f64 {
        if !self.gas_indices.contains(&i) {
            return 0.0;
        }
        let n_i = self.n_mol[i];
        if !is_finite_positive(n_i) {
            return 0.0;
        }
        safe_div(n_i, self.total_gas_moles(), 0.0).clamp(0.0, 1.0)
    }

    /// Mixture heat capacity `Σ n_i·cp_i` over gas species (J/K)
    pub fn mixture_cp_j_per_k(&self) -> f64 {
        self.gas_indices
            .iter()
            .filter_map(|&i| {
                let n = self.n_mol[i];
                let cp = self.species.get(i)?.cp_j_per_mol_k;
                (is_finite_positive(n) && is_finite_positive(cp)).then_some(n * cp)
            })
            .sum()
    }

    /// Heat leaving the reactor (W): `h·A·(T−Ta) + ε·σ·A·(T⁴−Ta⁴)`.
    ///
    /// Negative when the reactor is colder than ambient; 0 if anything is non-finite.
    pub fn heat_loss_w(&self) -> f64 {
        let t = self.temperature_k;
        let t_amb = self.config.ambient_temperature_k;
        if !t.is_finite() || !t_amb.is_finite() {
            return 0.0;
        }
        let area = self.config.area_m2;
        if !is_finite_positive(area) {
            return 0.0;
        }

        let q_conv = if is_finite_positive(self.config.h_w_per_m2_k) {
            self.config.h_w_per_m2_k * area * (t - t_amb)
        } else {
            0.0
        };

        let eps = self.config.emissivity.clamp(0.0, 1.0);
        let q_rad = if eps > 0.0 {
            let t4 = t.max(REACTOR_MIN_TEMP_K).powi(4);
            let ta4 = t_amb.max(REACTOR_MIN_TEMP_K).powi(4);
            eps * STEFAN_BOLTZMANN * area * (t4 - ta4)
        } else {
            0.0
        };

        let q_loss = q_conv + q_rad;
        if q_loss.is_finite() {
            q_loss
        } else {
            0.0
        }
    }

    fn safe_ambient_k(&self) -> f64 {
        if is_finite_positive(self.config.ambient_temperature_k) {
            self.config.ambient_temperature_k
        } else {
            FALLBACK_AMBIENT_K
        }
    }

    fn clamp_self(&mut self) {
        self.temperature_k = clamp_temperature(
            self.temperature_k,
            REACTOR_MIN_TEMP_K,
            REACTOR_MAX_TEMP_K,
            self.safe_ambient_k(),
        );
    }

    fn sanitize_inventory(&mut self) {
        let repaired = sanitize_moles(&mut self.n_mol);
        if repaired > 0 {
            warn!("Reactor inventory sanitized: {} entries reset to 0", repaired);
        }
    }

    /// Advance the reactor by `dt` seconds.
    ///
    /// # Returns
    ///
    /// The raw combustion heat release rate (W) from chemistry. The
    /// `combustion_heat_multiplier` only scales the heat coupled into the
    /// temperature, not the returned value.
    ///
    /// Fails only if `dt` is not finite and positive.
    pub fn step(&mut self, dt: f64, inputs: &ReactorInputs) -> Result<f64> {
        check_dt(dt)?;

        if !self.temperature_k.is_finite() {
            warn!("Reactor temperature non-finite, relaxing to ambient");
            self.temperature_k = self.safe_ambient_k();
        }

        let reaction = self.chemistry.react(
            dt,
            self.temperature_k,
            inputs.ignition_temp_floor_k,
            self.config.volume_m3,
            &mut self.n_mol,
            inputs.inhibitor_kg_per_m3,
        );
        let hrr_w = if is_finite_positive(reaction.heat_release_rate_w) {
            reaction.heat_release_rate_w
        } else {
            0.0
        };

        let cp = self.mixture_cp_j_per_k();
        if !is_finite_positive(cp) {
            // No thermal inertia: clamp and leave
            self.clamp_self();
            self.sanitize_inventory();
            return Ok(hrr_w);
        }

        let q_loss = self.heat_loss_w();
        let q_ext = if inputs.external_cooling_w.is_finite() {
            inputs.external_cooling_w
        } else {
            0.0
        };
        let multiplier = if inputs.combustion_heat_multiplier.is_finite() {
            inputs.combustion_heat_multiplier.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let q_net = hrr_w * multiplier - q_loss - q_ext;
        let d_t = q_net * dt / cp;
        if d_t.is_finite() {
            self.temperature_k =
                (self.temperature_k + d_t).clamp(REACTOR_MIN_TEMP_K, REACTOR_MAX_TEMP_K);
        } else {
            warn!("Reactor temperature update non-finite, relaxing to ambient");
            self.temperature_k = self
                .safe_ambient_k()
                .clamp(REACTOR_MIN_TEMP_K, REACTOR_MAX_TEMP_K);
        }

        self.sanitize_inventory();
        Ok(hrr_w)
    }
}
