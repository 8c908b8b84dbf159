//! Compartment Fire Core Library
//!
//! A real-time compartment fire engine: combustion kinetics, stratified zone
//! transport, surface radiation and pressure-driven flow between connected
//! compartments. Every step produces a finite state; numeric trouble inside a
//! step is clamped or relaxed toward ambient instead of being raised.
//!
//! ## Components
//!
//! - [`Chemistry`]: stateless single-step Arrhenius kinetics with stoichiometric limiting
//! - [`Reactor`]: well-mixed volume energy balance driving [`Chemistry`]
//! - [`ThreeZoneModel`]: upper/middle/lower zone stratification
//! - [`RadiationModel`]: view factors and grey-surface exchange with smoke attenuation
//! - [`CompartmentNetwork`]: compartments joined by openings with Bernoulli and stack flow
//!
//! The engine is single-threaded and synchronous. Embedding hosts that read
//! state from other threads must synchronize access themselves.

// Shared building blocks
pub mod constants;
pub mod error;
pub mod numeric;
pub mod species;

// Physics components
pub mod chemistry;
pub mod network;
pub mod radiation;
pub mod reactor;
pub mod zones;

pub use error::{EngineError, Result};
pub use species::{ChemistryIndex, Phase, Species, SpeciesTable};

pub use chemistry::{Chemistry, CombustionModel, ReactionResult};
pub use network::{CompartmentNetwork, ExchangeSummary, NetworkParams, Opening};
pub use radiation::{RadiationModel, Surface};
pub use reactor::{Reactor, ReactorConfig, ReactorInputs};
pub use zones::{ThreeZoneModel, Zone, ZoneCoupling};
