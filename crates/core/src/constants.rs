//! Physical constants shared by the engine
//!
//! SI units throughout. Values follow the usual engineering references; the
//! air properties are the dry-air values at room conditions used by zone models.

/// Universal gas constant (J/(mol·K))
pub const R_UNIVERSAL: f64 = 8.314;

/// Stefan-Boltzmann constant (W/(m²·K⁴))
/// Reference: Fundamental physics constant (Stefan 1879, Boltzmann 1884)
pub const STEFAN_BOLTZMANN: f64 = 5.67e-8;

/// Molar mass of air (kg/mol)
pub const MW_AIR: f64 = 0.029;

/// Specific heat of air at constant pressure (J/(kg·K))
pub const CP_AIR: f64 = 1005.0;

/// Gravitational acceleration (m/s²)
pub const G_ACCEL: f64 = 9.81;

/// Standard atmospheric pressure (Pa)
pub const ATM_PRESSURE: f64 = 101325.0;

/// Water freezing point (K), the floor for every zone temperature
pub const FREEZING_K: f64 = 273.15;

/// Default room temperature used before a zone model is reset (K)
pub const ROOM_TEMPERATURE_K: f64 = 293.15;

/// Reference temperature for compartment thermal overpressure (25°C)
pub const PRESSURE_REFERENCE_K: f64 = 298.15;

/// Seconds per hour, converts air changes per hour to per-second rates
pub const SECONDS_PER_HOUR: f64 = 3600.0;
