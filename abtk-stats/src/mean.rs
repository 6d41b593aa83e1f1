//! Comparing the means of a continuous per-unit metric.

use crate::error::{Error, Result};
use crate::stats::{Sample, SampleStats};
use crate::{check_alpha, degenerate_p_value, normal, Z_95};
use log::*;
use serde::Serialize;

/// The result of comparing two group means.  `effect = mean_b - mean_a`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MeanTestResult {
    pub n_a: usize,
    pub n_b: usize,
    pub mean_a: f64,
    pub mean_b: f64,
    pub effect: f64,
    /// If `ci_low == ci_high == effect` then neither group had any variance.
    pub ci_low: f64,
    pub ci_high: f64,
    /// Welch–Satterthwaite degrees of freedom (infinite when both variances
    /// are zero).
    pub df: f64,
    /// Two-sided p-value for "effect == 0".
    pub p_value: f64,
    pub alpha: f64,
}

impl MeanTestResult {
    pub fn is_significant(&self) -> bool {
        self.p_value < self.alpha
    }
}

/// Welch's approximate t-test of the means of group A and group B.
///
/// Welch's test doesn't assume that the two groups share a variance, and
/// tolerates unequal group sizes.
pub fn mean_diff(
    group_a: impl IntoIterator<Item = f64>,
    group_b: impl IntoIterator<Item = f64>,
    alpha: f64,
) -> Result<MeanTestResult> {
    check_alpha(alpha)?;
    let a = Sample::new(group_a)?;
    let b = Sample::new(group_b)?;
    Ok(welch(a.stats(), b.stats(), alpha))
}

/// As [`mean_diff`], but from per-group summary statistics rather than the
/// raw observations.
pub fn mean_diff_from_stats(a: SampleStats, b: SampleStats, alpha: f64) -> Result<MeanTestResult> {
    check_alpha(alpha)?;
    for x in [a, b] {
        if x.count == 0 {
            return Err(Error::EmptyInput);
        }
        if !x.mean.is_finite() || !x.var.is_finite() || x.var < 0. {
            return Err(Error::InvalidInput(format!(
                "summary statistics must be finite, with non-negative variance: {:?}",
                x
            )));
        }
    }
    Ok(welch(a, b, alpha))
}

fn welch(a: SampleStats, b: SampleStats, alpha: f64) -> MeanTestResult {
    let effect = b.mean - a.mean;
    // The variance of `b.mean - a.mean` is the sum of the variances of the
    // two estimated means.
    let standard_error = (a.mean_var() + b.mean_var()).sqrt();
    let df = welch_df(a, b);
    trace!("Welch: effect={} se={} df={}", effect, standard_error, df);

    let (ci_low, ci_high, p_value) = if standard_error == 0. {
        debug!("Both groups are constant; the effect {} is exact", effect);
        (effect, effect, degenerate_p_value(effect))
    } else {
        let t = effect / standard_error;
        let p_value = 2. * (1. - normal_approx_t_cdf(t.abs(), df));
        (
            effect - Z_95 * standard_error,
            effect + Z_95 * standard_error,
            p_value,
        )
    };

    MeanTestResult {
        n_a: a.count,
        n_b: b.count,
        mean_a: a.mean,
        mean_b: b.mean,
        effect,
        ci_low,
        ci_high,
        df,
        p_value,
        alpha,
    }
}

/// The Welch–Satterthwaite approximation to the degrees of freedom of
/// s²_a/n_a + s²_b/n_b.
///
/// A group contributes nothing to the denominator if it has a single
/// observation or zero variance.  If neither contributes the result is
/// infinite, ie. the normal limit.
pub fn welch_df(a: SampleStats, b: SampleStats) -> f64 {
    let k = |x: SampleStats| {
        if x.count > 1 && x.var > 0. {
            x.mean_var() * x.mean_var() / (x.count - 1) as f64
        } else {
            0.
        }
    };
    let denominator = k(a) + k(b);
    if denominator == 0. {
        return f64::INFINITY;
    }
    let var = a.mean_var() + b.mean_var();
    var * var / denominator
}

/// Stands in for the CDF of Student's t with `df` degrees of freedom.
///
/// This is the standard normal CDF, whatever `df` is.  For the group sizes
/// of online experiments (hundreds of units and up) the two are
/// indistinguishable; for small samples the p-values come out too small.
pub fn normal_approx_t_cdf(t: f64, _df: f64) -> f64 {
    normal::cdf(t)
}
