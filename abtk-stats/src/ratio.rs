//! Comparing ratio-of-totals metrics.
//!
//! A ratio metric is `sum(numerator) / sum(denominator)` over the units of a
//! group, eg. revenue per booking or clicks per session.  Averaging
//! per-unit ratios instead would be wrong (and undefined whenever a unit's
//! denominator is zero), so we treat the ratio as a property of the group
//! totals and estimate its uncertainty either with the delta method or with
//! a bootstrap.

use crate::error::{Error, Result};
use crate::stats::{check_paired, Sample, SampleStats};
use crate::{check_alpha, degenerate_p_value, normal, DEFAULT_ALPHA, Z_95};
use log::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_BOOTSTRAP_SAMPLES: usize = 2000;

/// Fewer resamples than this give a percentile interval too coarse to use.
pub const MIN_BOOTSTRAP_SAMPLES: usize = 100;

/// How to estimate the uncertainty of a ratio.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RatioMethod {
    /// First-order linearization.  Fast, and fine for large groups.
    #[default]
    Delta,
    /// Percentile bootstrap over resampled units.
    Bootstrap,
}

impl FromStr for RatioMethod {
    type Err = Error;
    fn from_str(x: &str) -> Result<RatioMethod> {
        match x {
            "delta" => Ok(RatioMethod::Delta),
            "bootstrap" => Ok(RatioMethod::Bootstrap),
            _ => Err(Error::InvalidParameter(format!(
                "method must be either 'delta' or 'bootstrap', got '{}'",
                x
            ))),
        }
    }
}

impl fmt::Display for RatioMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RatioMethod::Delta => f.write_str("delta"),
            RatioMethod::Bootstrap => f.write_str("bootstrap"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RatioOptions {
    pub method: RatioMethod,
    /// Only used by [`RatioMethod::Bootstrap`]
    pub bootstrap_samples: usize,
    /// Only used by [`RatioMethod::Bootstrap`]
    pub seed: u64,
    pub alpha: f64,
}

impl Default for RatioOptions {
    fn default() -> Self {
        RatioOptions {
            method: RatioMethod::Delta,
            bootstrap_samples: DEFAULT_BOOTSTRAP_SAMPLES,
            seed: 0,
            alpha: DEFAULT_ALPHA,
        }
    }
}

/// The result of comparing two ratio metrics.  `effect = ratio_b - ratio_a`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RatioTestResult {
    pub n_a: usize,
    pub n_b: usize,
    pub ratio_a: f64,
    pub ratio_b: f64,
    pub effect: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    pub p_value: f64,
    pub method: RatioMethod,
    pub alpha: f64,
}

impl RatioTestResult {
    pub fn is_significant(&self) -> bool {
        self.p_value < self.alpha
    }
}

/// `sum(numerators) / sum(denominators)`
pub fn ratio_of_totals(numerators: &[f64], denominators: &[f64]) -> Result<f64> {
    let total_den = denominators.iter().sum::<f64>();
    if total_den == 0. {
        return Err(Error::UndefinedRatio("Total denominator"));
    }
    Ok(numerators.iter().sum::<f64>() / total_den)
}

/// Compare the ratio metric of group B against group A.
///
/// Each group is given as per-unit numerators and denominators, which must
/// pair up one-to-one.
pub fn ratio_diff(
    numerators_a: impl IntoIterator<Item = f64>,
    denominators_a: impl IntoIterator<Item = f64>,
    numerators_b: impl IntoIterator<Item = f64>,
    denominators_b: impl IntoIterator<Item = f64>,
    opts: &RatioOptions,
) -> Result<RatioTestResult> {
    check_alpha(opts.alpha)?;
    if opts.method == RatioMethod::Bootstrap && opts.bootstrap_samples < MIN_BOOTSTRAP_SAMPLES {
        return Err(Error::InvalidParameter(format!(
            "bootstrap_samples must be at least {} for a stable interval, got {}",
            MIN_BOOTSTRAP_SAMPLES, opts.bootstrap_samples
        )));
    }
    let a_num = Sample::new(numerators_a)?;
    let a_den = Sample::new(denominators_a)?;
    let b_num = Sample::new(numerators_b)?;
    let b_den = Sample::new(denominators_b)?;
    check_paired("Group A numerators and denominators", &a_num, &a_den)?;
    check_paired("Group B numerators and denominators", &b_num, &b_den)?;

    let a = Units::new(a_num.as_slice(), a_den.as_slice())?;
    let b = Units::new(b_num.as_slice(), b_den.as_slice())?;
    let effect = b.ratio - a.ratio;

    let (ci_low, ci_high, p_value) = match opts.method {
        RatioMethod::Delta => delta(a, b, effect)?,
        RatioMethod::Bootstrap => bootstrap(a, b, opts)?,
    };

    Ok(RatioTestResult {
        n_a: a.len(),
        n_b: b.len(),
        ratio_a: a.ratio,
        ratio_b: b.ratio,
        effect,
        ci_low,
        ci_high,
        p_value,
        method: opts.method,
        alpha: opts.alpha,
    })
}

/// One group's paired per-unit contributions.
#[derive(Clone, Copy)]
struct Units<'a> {
    num: &'a [f64],
    den: &'a [f64],
    ratio: f64,
}

impl<'a> Units<'a> {
    fn new(num: &'a [f64], den: &'a [f64]) -> Result<Units<'a>> {
        Ok(Units {
            num,
            den,
            ratio: ratio_of_totals(num, den)?,
        })
    }

    fn len(self) -> usize {
        self.num.len()
    }

    /// The delta-method variance of the group ratio r.
    ///
    /// Each unit contributes a residual s_i = x_i - r·y_i, and
    ///
    /// Var(r) ≈ Var(s) / (n · mean(y)²).
    ///
    /// This is a first-order linearization.  It says nothing about
    /// high-leverage units (a handful of huge denominators), where its
    /// accuracy degrades.
    fn delta_variance(self) -> Result<f64> {
        let n = self.len();
        if n < 2 {
            return Ok(0.);
        }
        let mean_den = self.den.iter().sum::<f64>() / n as f64;
        if mean_den == 0. {
            return Err(Error::UndefinedRatio("Mean denominator"));
        }
        let residuals = self
            .num
            .iter()
            .zip(self.den)
            .map(|(x, y)| x - self.ratio * y)
            .collect::<SampleStats>();
        Ok(residuals.var / (n as f64 * mean_den * mean_den))
    }

    /// The ratio of a resample (with replacement) of this group's units.
    fn resampled_ratio(self, rng: &mut impl Rng) -> Result<f64> {
        let n = self.len();
        let mut total_num = 0.;
        let mut total_den = 0.;
        for _ in 0..n {
            let i = rng.gen_range(0..n);
            total_num += self.num[i];
            total_den += self.den[i];
        }
        if total_den == 0. {
            return Err(Error::UndefinedRatio("Total denominator of a bootstrap resample"));
        }
        Ok(total_num / total_den)
    }
}

fn delta(a: Units, b: Units, effect: f64) -> Result<(f64, f64, f64)> {
    let standard_error = (a.delta_variance()? + b.delta_variance()?).sqrt();
    if standard_error == 0. {
        debug!("Every unit sits exactly on its group's ratio; the effect {} is exact", effect);
        return Ok((effect, effect, degenerate_p_value(effect)));
    }
    Ok((
        effect - Z_95 * standard_error,
        effect + Z_95 * standard_error,
        normal::two_sided_p(effect / standard_error),
    ))
}

fn bootstrap(a: Units, b: Units, opts: &RatioOptions) -> Result<(f64, f64, f64)> {
    let samples = opts.bootstrap_samples;
    debug!(
        "Bootstrapping {} resamples of {}+{} units (seed {})",
        samples,
        a.len(),
        b.len(),
        opts.seed
    );
    let mut rng = ChaCha8Rng::seed_from_u64(opts.seed);
    let mut effects = Vec::with_capacity(samples);
    for _ in 0..samples {
        let ratio_a = a.resampled_ratio(&mut rng)?;
        let ratio_b = b.resampled_ratio(&mut rng)?;
        effects.push(ratio_b - ratio_a);
    }
    effects.sort_by(f64::total_cmp);

    // Percentile interval
    let low_index = ((opts.alpha / 2.) * samples as f64) as usize;
    let high_index = (((1. - opts.alpha / 2.) * samples as f64) as usize).saturating_sub(1);
    let ci_low = effects[low_index];
    let ci_high = effects[high_index];

    // How often does a resample land on the far side of zero?  A heuristic,
    // not an inverted test.
    let frac_leq_zero = effects.iter().filter(|&&e| e <= 0.).count() as f64 / samples as f64;
    let frac_geq_zero = effects.iter().filter(|&&e| e >= 0.).count() as f64 / samples as f64;
    let p_value = (2. * frac_leq_zero.min(frac_geq_zero)).clamp(0., 1.);

    Ok((ci_low, ci_high, p_value))
}
