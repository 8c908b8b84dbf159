//! Species table shared by reactors and zone models
//!
//! Every molar inventory in the engine is a plain `Vec<f64>` index-aligned to
//! one [`SpeciesTable`]. The table is fixed at construction, so components can
//! size their vectors once and never resize them.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Thermodynamic phase of a species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Contributes to gas heat capacity and mole fractions
    Gas,
    /// Tracked in the inventory but thermally inert for the gas mixture
    Condensed,
}

/// A single chemical species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    /// Molar mass (kg/mol)
    pub molar_mass_kg_per_mol: f64,
    /// Molar heat capacity at constant pressure (J/(mol·K))
    pub cp_j_per_mol_k: f64,
    pub phase: Phase,
}

impl Species {
    /// Create a gas-phase species
    pub fn gas(name: &str, molar_mass_kg_per_mol: f64, cp_j_per_mol_k: f64) -> Self {
        Self {
            name: name.to_string(),
            molar_mass_kg_per_mol,
            cp_j_per_mol_k,
            phase: Phase::Gas,
        }
    }
}

/// Validated, immutable, ordered list of species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTable {
    species: Vec<Species>,
}

impl SpeciesTable {
    /// Build a table. Rejects an empty list, non-positive molar masses and
    /// negative or non-finite heat capacities.
    pub fn new(species: Vec<Species>) -> Result<Self> {
        if species.is_empty() {
            return Err(EngineError::invalid_argument(
                "species",
                "species table must not be empty",
            ));
        }
        for s in &species {
            if !crate::numeric::is_finite_positive(s.molar_mass_kg_per_mol) {
                return Err(EngineError::invalid_argument(
                    "molar_mass_kg_per_mol",
                    format!("species '{}' has invalid molar mass {}", s.name, s.molar_mass_kg_per_mol),
                ));
            }
            if !s.cp_j_per_mol_k.is_finite() || s.cp_j_per_mol_k < 0.0 {
                return Err(EngineError::invalid_argument(
                    "cp_j_per_mol_k",
                    format!("species '{}' has invalid heat capacity {}", s.name, s.cp_j_per_mol_k),
                ));
            }
        }
        Ok(Self { species })
    }

    /// Air diluent, oxygen, propane fuel and the two combustion products.
    ///
    /// Index 0 (N2) is the carrier gas used by zone reset and ventilation.
    pub fn standard() -> Self {
        Self {
            species: vec![
                Species::gas("N2", 0.028014, 29.12),
                Species::gas("O2", 0.031998, 29.38),
                Species::gas("FUEL", 0.044097, 73.6),
                Species::gas("CO2", 0.044009, 37.12),
                Species::gas("H2O", 0.018015, 33.58),
            ],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// Always false for a validated table
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn get(&self, index: usize) -> Option<&Species> {
        self.species.get(index)
    }

    /// Position of the species named `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.species.iter().position(|s| s.name == name)
    }

    /// Indices of gas-phase species, in table order
    pub fn gas_indices(&self) -> Vec<usize> {
        self.species
            .iter()
            .enumerate()
            .filter(|(_, s)| s.phase == Phase::Gas)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Positions of the four reacting species in a [`SpeciesTable`]
///
/// Signed so that a caller can disable the reaction with a negative index;
/// any negative or out-of-range entry turns `react` into a deterministic no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChemistryIndex {
    pub fuel: i32,
    pub o2: i32,
    pub co2: i32,
    pub h2o: i32,
}

/// Resolved, in-range reacting-species positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedIndex {
    pub fuel: usize,
    pub o2: usize,
    pub co2: usize,
    pub h2o: usize,
}

impl ChemistryIndex {
    pub const fn new(fuel: i32, o2: i32, co2: i32, h2o: i32) -> Self {
        Self { fuel, o2, co2, h2o }
    }

    /// An index that never reacts
    pub const fn disabled() -> Self {
        Self::new(-1, -1, -1, -1)
    }

    /// Look up `FUEL`, `O2`, `CO2` and `H2O` by name; missing names disable the reaction.
    pub fn from_table(table: &SpeciesTable) -> Self {
        let find = |name: &str| table.index_of(name).map_or(-1, |i| i as i32);
        Self::new(find("FUEL"), find("O2"), find("CO2"), find("H2O"))
    }

    /// Positions as `usize`, or `None` if any is negative or `>= len`.
    pub(crate) fn resolve(&self, len: usize) -> Option<ResolvedIndex> {
        let check = |i: i32| usize::try_from(i).ok().filter(|&u| u < len);
        Some(ResolvedIndex {
            fuel: check(self.fuel)?,
            o2: check(self.o2)?,
            co2: check(self.co2)?,
            h2o: check(self.h2o)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_resolves_reacting_species() {
        let table = SpeciesTable::standard();
        let idx = ChemistryIndex::from_table(&table);
        assert_eq!(idx, ChemistryIndex::new(2, 1, 3, 4));

        let resolved = idx.resolve(table.len()).unwrap();
        assert_eq!(resolved.fuel, 2);
        assert_eq!(table.gas_indices(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_negative_or_out_of_range_index_disables() {
        assert!(ChemistryIndex::disabled().resolve(5).is_none());
        assert!(ChemistryIndex::new(0, 1, 2, 5).resolve(5).is_none());
        assert!(ChemistryIndex::new(0, -3, 2, 3).resolve(5).is_none());
    }

    #[test]
    fn test_table_validation() {
        assert!(SpeciesTable::new(vec![]).is_err());
        assert!(SpeciesTable::new(vec![Species::gas("X", 0.0, 29.0)]).is_err());
        assert!(SpeciesTable::new(vec![Species::gas("X", 0.02, -1.0)]).is_err());

        let table = SpeciesTable::new(vec![
            Species::gas("AIR", 0.029, 29.1),
            Species {
                name: "SOOT".to_string(),
                molar_mass_kg_per_mol: 0.012,
                cp_j_per_mol_k: 8.5,
                phase: Phase::Condensed,
            },
        ])
        .unwrap();
        assert_eq!(table.gas_indices(), vec![0]);
        assert_eq!(table.index_of("SOOT"), Some(1));
        assert!(!table.is_empty());
    }
}
