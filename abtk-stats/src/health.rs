//! Experiment health checks.
//!
//! Before reading any metric, check that the traffic split actually looks
//! like the one that was configured.  A sample ratio mismatch (SRM) usually
//! means broken randomization or lost events, and invalidates every other
//! comparison in the experiment.

use crate::error::{Error, Result};
use crate::{check_alpha, chi_squared};
use log::*;
use serde::Serialize;

/// An even 50/50 split.
pub const DEFAULT_SPLIT: (f64, f64) = (0.5, 0.5);

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SrmResult {
    pub count_a: u64,
    pub count_b: u64,
    pub expected_a: f64,
    pub expected_b: f64,
    /// Pearson's χ² statistic (1 degree of freedom)
    pub chi2: f64,
    pub p_value: f64,
    pub alpha: f64,
}

impl SrmResult {
    /// Whether the observed split is too unlikely under the expected one.
    pub fn is_mismatch(&self) -> bool {
        self.p_value < self.alpha
    }
}

/// A χ² goodness-of-fit test of the observed assignment counts against
/// `expected_split`.
pub fn srm_check(
    count_a: u64,
    count_b: u64,
    expected_split: (f64, f64),
    alpha: f64,
) -> Result<SrmResult> {
    check_alpha(alpha)?;
    let total = count_a.checked_add(count_b).ok_or_else(|| {
        Error::InvalidParameter(format!("too many units to count: {} + {}", count_a, count_b))
    })?;
    if total == 0 {
        return Err(Error::EmptyInput);
    }
    let (p_a, p_b) = expected_split;
    if !(p_a > 0. && p_b > 0.) {
        return Err(Error::InvalidParameter(format!(
            "expected split probabilities must be positive, got ({}, {})",
            p_a, p_b
        )));
    }
    if (p_a + p_b - 1.).abs() > 1e-9 {
        return Err(Error::InvalidParameter(format!(
            "expected split must sum to 1, got {} + {} = {}",
            p_a,
            p_b,
            p_a + p_b
        )));
    }

    let expected_a = total as f64 * p_a;
    let expected_b = total as f64 * p_b;
    let chi2 = (count_a as f64 - expected_a).powi(2) / expected_a
        + (count_b as f64 - expected_b).powi(2) / expected_b;
    let p_value = chi_squared::sf_df1(chi2);
    debug!(
        "SRM: observed {}/{}, expected {:.1}/{:.1}, χ²={:.3}, p={}",
        count_a, count_b, expected_a, expected_b, chi2, p_value
    );

    Ok(SrmResult {
        count_a,
        count_b,
        expected_a,
        expected_b,
        chi2,
        p_value,
        alpha,
    })
}
