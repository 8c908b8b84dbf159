//! Openings between compartments

use serde::{Deserialize, Serialize};

use crate::error::{check_positive, EngineError, Result};

/// Default discharge coefficient for a sharp-edged door or window
pub const DEFAULT_DISCHARGE_COEFFICIENT: f64 = 0.65;

/// A vent, door or window connecting two compartments
///
/// `from`/`to` only fix the sign convention of the pair; flow through an
/// opening can go either way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    pub from: usize,
    pub to: usize,
    /// Vertical extent (m)
    pub height_m: f64,
    /// Horizontal extent (m)
    pub width_m: f64,
    /// Discharge coefficient in (0, 1]
    pub discharge_coefficient: f64,
}

impl Opening {
    pub fn new(from: usize, to: usize, height_m: f64, width_m: f64) -> Self {
        Self {
            from,
            to,
            height_m,
            width_m,
            discharge_coefficient: DEFAULT_DISCHARGE_COEFFICIENT,
        }
    }

    #[must_use]
    pub fn with_discharge_coefficient(mut self, cd: f64) -> Self {
        self.discharge_coefficient = cd;
        self
    }

    /// Flow area (m²)
    pub fn area_m2(&self) -> f64 {
        self.height_m * self.width_m
    }

    /// Check geometry and endpoints against a network of `compartment_count` compartments.
    pub(crate) fn validate(&self, compartment_count: usize) -> Result<()> {
        if self.from >= compartment_count {
            return Err(EngineError::invalid_argument(
                "from",
                format!(
                    "compartment {} does not exist ({} compartments)",
                    self.from, compartment_count
                ),
            ));
        }
        if self.to >= compartment_count {
            return Err(EngineError::invalid_argument(
                "to",
                format!(
                    "compartment {} does not exist ({} compartments)",
                    self.to, compartment_count
                ),
            ));
        }
        if self.from == self.to {
            return Err(EngineError::invalid_argument(
                "to",
                "an opening must connect two different compartments",
            ));
        }
        check_positive("height_m", self.height_m)?;
        check_positive("width_m", self.width_m)?;
        let cd = self.discharge_coefficient;
        if cd.is_nan() || cd <= 0.0 || cd > 1.0 {
            return Err(EngineError::invalid_argument(
                "discharge_coefficient",
                format!("must be in (0, 1], got {cd}"),
            ));
        }
        Ok(())
    }
}
