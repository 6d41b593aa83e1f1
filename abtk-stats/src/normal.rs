//! The standard normal distribution.
//!
//! Every estimator in this crate reduces its test statistic to a standard
//! normal deviate, so these few functions carry all of the tail-probability
//! work.

use crate::error::{Error, Result};
use special::Error as _;
use std::f64::consts::SQRT_2;

/// P(Z ≤ z) for Z ~ N(0, 1).
pub fn cdf(z: f64) -> f64 {
    0.5 * (1. + (z / SQRT_2).error())
}

/// The two-sided p-value of a standard normal test statistic, ie.
/// P(|Z| ≥ |z|).
pub fn two_sided_p(z: f64) -> f64 {
    2. * (1. - cdf(z.abs()))
}

// Acklam's rational approximation.  Relative error is below 1.15e-9 over
// the whole of (0, 1).
const A: [f64; 6] = [
    -3.969683028665376e+01,
    2.209460984245205e+02,
    -2.759285104469687e+02,
    1.383577518672690e+02,
    -3.066479806614716e+01,
    2.506628277459239e+00,
];
const B: [f64; 5] = [
    -5.447609879822406e+01,
    1.615858368580409e+02,
    -1.556989798598866e+02,
    6.680131188771972e+01,
    -1.328068155288572e+01,
];
const C: [f64; 6] = [
    -7.784894002430293e-03,
    -3.223964580411365e-01,
    -2.400758277161838e+00,
    -2.549732539343734e+00,
    4.374664141464968e+00,
    2.938163982698783e+00,
];
const D: [f64; 4] = [
    7.784695709041462e-03,
    3.224671290700398e-01,
    2.445134137142996e+00,
    3.754408661907416e+00,
];

/// Below this (and above `1 - P_LOW`) the tail form of the approximation is
/// used.
const P_LOW: f64 = 0.02425;

/// The inverse CDF (quantile function) of the standard normal distribution.
///
/// `p` must lie strictly between 0 and 1.
pub fn inv_cdf(p: f64) -> Result<f64> {
    if !(p > 0. && p < 1.) {
        return Err(Error::Domain(p));
    }
    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.)
    };
    let z = if p < P_LOW {
        tail((-2. * p.ln()).sqrt())
    } else if p > 1. - P_LOW {
        -tail((-2. * (1. - p).ln()).sqrt())
    } else {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.)
    };
    Ok(z)
}
