//! Engine error type
//!
//! Only configuration and contract violations are errors. Numeric trouble
//! inside a step is handled by the fail-safe helpers in [`crate::numeric`].

use thiserror::Error;

/// Errors raised at configuration/mutation boundaries and for step contract violations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A value is outside its valid range (bad geometry, coefficient, `dt`, array length).
    #[error("invalid argument '{param}': {message}")]
    InvalidArgument {
        param: &'static str,
        message: String,
    },

    /// An id does not name an existing surface/compartment/zone.
    #[error("{what} id {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Derived data was queried before it was computed.
    #[error("illegal state: {0}")]
    IllegalState(String),
}

impl EngineError {
    /// Create an `InvalidArgument` error for `param`.
    pub fn invalid_argument(param: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            param,
            message: message.into(),
        }
    }

    /// Create an `InvalidArgument` error for a value that must be finite and positive.
    pub fn not_finite_positive(param: &'static str, value: f64) -> Self {
        Self::invalid_argument(param, format!("must be finite and positive, got {value}"))
    }

    /// Create an `OutOfRange` error.
    pub fn out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        Self::OutOfRange { what, index, len }
    }

    /// Create an `IllegalState` error.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }
}

/// Result alias used by every fallible engine API.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Validate a simulation timestep.
pub(crate) fn check_dt(dt: f64) -> Result<()> {
    if crate::numeric::is_finite_positive(dt) {
        Ok(())
    } else {
        Err(EngineError::not_finite_positive("dt", dt))
    }
}

/// Validate a value that must be finite and strictly positive.
pub(crate) fn check_positive(param: &'static str, value: f64) -> Result<()> {
    if crate::numeric::is_finite_positive(value) {
        Ok(())
    } else {
        Err(EngineError::not_finite_positive(param, value))
    }
}

/// Validate a value that must lie in the closed unit interval.
pub(crate) fn check_unit_interval(param: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::invalid_argument(
            param,
            format!("must be in [0, 1], got {value}"),
        ))
    }
}
