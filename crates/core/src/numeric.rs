//! Checked numeric helpers
//!
//! The step paths never raise errors for numeric degeneracy. Instead every
//! guard in the hot loops goes through these helpers, which clamp, floor or
//! fall back to a caller-supplied safe value.

/// True when `x` is finite and strictly positive.
#[inline]
pub fn is_finite_positive(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

/// `x` if finite, otherwise `fallback`.
#[inline]
pub fn finite_or(x: f64, fallback: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        fallback
    }
}

/// `x` floored at zero; non-finite input maps to zero.
#[inline]
pub fn non_negative(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Division that returns `fallback` when the denominator is zero/non-finite
/// or the quotient is not finite.
#[inline]
pub fn safe_div(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if !denominator.is_finite() || denominator == 0.0 {
        return fallback;
    }
    let q = numerator / denominator;
    if q.is_finite() {
        q
    } else {
        fallback
    }
}

/// Clamp a temperature into `[min_k, max_k]`.
///
/// A non-finite temperature is replaced by `fallback_k` (itself clamped),
/// so the result is always finite.
#[inline]
pub fn clamp_temperature(temperature_k: f64, min_k: f64, max_k: f64, fallback_k: f64) -> f64 {
    let t = if temperature_k.is_finite() {
        temperature_k
    } else {
        fallback_k
    };
    if t.is_finite() {
        t.clamp(min_k, max_k)
    } else {
        min_k
    }
}

/// Repair a species vector in place: negative or non-finite entries become 0.
///
/// Returns the number of entries that needed repair.
pub fn sanitize_moles(n_mol: &mut [f64]) -> usize {
    let mut repaired = 0;
    for n in n_mol.iter_mut() {
        if !n.is_finite() || *n < 0.0 {
            *n = 0.0;
            repaired += 1;
        }
    }
    repaired
}
