//! Comparing conversion rates (binary per-unit outcomes).
//!
//! The naive interval p̂ ± z·√(p̂(1-p̂)/n) collapses to a point when nobody
//! (or everybody) converts, and can poke outside [0, 1] near the edges.  We
//! use Wilson score intervals for each group and combine them with
//! Newcombe's method to get an interval for the difference.

use crate::error::{Error, Result};
use crate::{check_alpha, degenerate_p_value, normal, Z_95};
use log::*;
use serde::Serialize;

/// A per-unit binary outcome: did this unit convert?
///
/// Implemented for `bool`, and for numbers which are exactly 0 or 1.
pub trait Outcome: Copy {
    /// `None` if the value isn't a valid binary outcome.
    fn converted(self) -> Option<bool>;
}

impl Outcome for bool {
    fn converted(self) -> Option<bool> {
        Some(self)
    }
}

impl Outcome for f64 {
    fn converted(self) -> Option<bool> {
        if self == 0. {
            Some(false)
        } else if self == 1. {
            Some(true)
        } else {
            None
        }
    }
}

macro_rules! integer_outcome {
    ($($t:ty),*) => {
        $(impl Outcome for $t {
            fn converted(self) -> Option<bool> {
                match self {
                    0 => Some(false),
                    1 => Some(true),
                    _ => None,
                }
            }
        })*
    };
}
integer_outcome!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// The result of comparing two conversion rates.  `effect = rate_b - rate_a`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ConversionTestResult {
    pub n_a: usize,
    pub n_b: usize,
    pub conversions_a: usize,
    pub conversions_b: usize,
    pub rate_a: f64,
    pub rate_b: f64,
    pub effect: f64,
    /// Newcombe's interval for the difference.  Not clamped to [-1, 1].
    pub ci_low: f64,
    pub ci_high: f64,
    /// Two-sided p-value of the pooled z-test.
    pub p_value: f64,
    pub alpha: f64,
}

impl ConversionTestResult {
    pub fn is_significant(&self) -> bool {
        self.p_value < self.alpha
    }
}

/// Count `(conversions, units)` in a group of outcomes.
fn tally<T: Outcome>(group: impl IntoIterator<Item = T>) -> Result<(usize, usize)> {
    let mut conversions = 0;
    let mut n = 0;
    for x in group {
        match x.converted() {
            Some(converted) => conversions += converted as usize,
            None => {
                return Err(Error::InvalidInput(
                    "conversion data must contain only 0/1 or boolean values".into(),
                ))
            }
        }
        n += 1;
    }
    if n == 0 {
        return Err(Error::EmptyInput);
    }
    Ok((conversions, n))
}

/// Compare the conversion rate of group B against group A.
pub fn conversion_diff<T: Outcome>(
    group_a: impl IntoIterator<Item = T>,
    group_b: impl IntoIterator<Item = T>,
    alpha: f64,
) -> Result<ConversionTestResult> {
    check_alpha(alpha)?;
    let (conversions_a, n_a) = tally(group_a)?;
    let (conversions_b, n_b) = tally(group_b)?;
    conversion_diff_from_counts(conversions_a, n_a, conversions_b, n_b, alpha)
}

/// As [`conversion_diff`], but from pre-aggregated counts.
pub fn conversion_diff_from_counts(
    conversions_a: usize,
    n_a: usize,
    conversions_b: usize,
    n_b: usize,
    alpha: f64,
) -> Result<ConversionTestResult> {
    check_alpha(alpha)?;
    if n_a == 0 || n_b == 0 {
        return Err(Error::EmptyInput);
    }
    if conversions_a > n_a || conversions_b > n_b {
        return Err(Error::InvalidInput(format!(
            "conversions can't exceed units ({}/{}, {}/{})",
            conversions_a, n_a, conversions_b, n_b
        )));
    }

    let rate_a = conversions_a as f64 / n_a as f64;
    let rate_b = conversions_b as f64 / n_b as f64;
    let effect = rate_b - rate_a;

    let (a_low, a_high) = wilson_interval(conversions_a, n_a, Z_95)?;
    let (b_low, b_high) = wilson_interval(conversions_b, n_b, Z_95)?;
    let ci_low = b_low - a_high;
    let ci_high = b_high - a_low;

    let pooled = (conversions_a + conversions_b) as f64 / (n_a + n_b) as f64;
    let denom = (pooled * (1. - pooled) * (1. / n_a as f64 + 1. / n_b as f64)).sqrt();
    let p_value = if denom == 0. {
        debug!("Every unit had the same outcome (pooled rate {})", pooled);
        degenerate_p_value(effect)
    } else {
        normal::two_sided_p(effect / denom)
    };

    Ok(ConversionTestResult {
        n_a,
        n_b,
        conversions_a,
        conversions_b,
        rate_a,
        rate_b,
        effect,
        ci_low,
        ci_high,
        p_value,
        alpha,
    })
}

/// The Wilson score interval for a proportion `successes / n`, at critical
/// value `z`.  Both bounds lie in [0, 1].
pub fn wilson_interval(successes: usize, n: usize, z: f64) -> Result<(f64, f64)> {
    if n == 0 {
        return Err(Error::InvalidParameter("n must be positive".into()));
    }
    let n = n as f64;
    let p_hat = successes as f64 / n;
    let z2 = z * z;

    let denom = 1. + z2 / n;
    let center = (p_hat + z2 / (2. * n)) / denom;
    let margin = z * ((p_hat * (1. - p_hat) + z2 / (4. * n)) / n).sqrt() / denom;

    Ok(((center - margin).max(0.), (center + margin).min(1.)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use approx::*;

    #[test]
    fn worked_example() {
        let a = [1, 0, 0, 1, 0, 0, 0, 0, 1, 0];
        let b = [1, 1, 0, 1, 0, 1, 1, 0, 1, 0];
        let res = conversion_diff(a, b, 0.05).unwrap();
        assert_eq!((res.conversions_a, res.n_a), (3, 10));
        assert_eq!((res.conversions_b, res.n_b), (6, 10));
        assert_eq!(res.rate_a, 0.3);
        assert_eq!(res.rate_b, 0.6);
        assert_relative_eq!(res.effect, 0.3, max_relative = 1e-12);
        assert_relative_eq!(res.ci_low, -0.29055723257024835, max_relative = 1e-12);
        assert_relative_eq!(res.ci_high, 0.7240331313102784, max_relative = 1e-12);
        assert_relative_eq!(res.p_value, 0.17752985241215358, max_relative = 1e-9);
        assert!(!res.is_significant());
    }

    #[test]
    fn wilson() {
        let (lo, hi) = wilson_interval(10, 100, Z_95).unwrap();
        assert_relative_eq!(lo, 0.05522854161313613, max_relative = 1e-12);
        assert_relative_eq!(hi, 0.1743673043676654, max_relative = 1e-12);

        // Zero and full conversion still give a non-degenerate interval
        let (lo, hi) = wilson_interval(0, 1000, Z_95).unwrap();
        assert_eq!(lo, 0.);
        assert_relative_eq!(hi, 0.003826898586390522, max_relative = 1e-12);
        let (lo, hi) = wilson_interval(1000, 1000, Z_95).unwrap();
        assert_relative_eq!(lo, 0.9961731014136095, max_relative = 1e-12);
        assert_eq!(hi, 1.);

        assert!(matches!(
            wilson_interval(0, 0, Z_95),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn all_zero_or_all_one() {
        let res = conversion_diff(vec![0; 1000], vec![0; 1000], 0.05).unwrap();
        assert_eq!(res.rate_a, 0.);
        assert_eq!(res.rate_b, 0.);
        assert_eq!(res.effect, 0.);
        assert_eq!(res.p_value, 1.);
        assert!(res.ci_low <= 0. && 0. <= res.ci_high);

        let res = conversion_diff(vec![true; 1000], vec![true; 1000], 0.05).unwrap();
        assert_eq!(res.rate_a, 1.);
        assert_eq!(res.rate_b, 1.);
        assert_eq!(res.effect, 0.);
        assert_eq!(res.p_value, 1.);
    }

    #[test]
    fn accepts_numbers_and_bools() {
        let ints = conversion_diff(vec![0u8, 1, 1], vec![1u8, 1, 1], 0.05).unwrap();
        let bools = conversion_diff(vec![false, true, true], vec![true; 3], 0.05).unwrap();
        let floats = conversion_diff(vec![0., 1., 1.], vec![1.; 3], 0.05).unwrap();
        assert_eq!(ints, bools);
        assert_eq!(ints, floats);
    }

    #[test]
    fn rejects_non_binary() {
        assert!(matches!(
            conversion_diff(vec![0, 1, 2], vec![1], 0.05),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            conversion_diff(vec![0.5], vec![1.], 0.05),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            conversion_diff(vec![-1i64], vec![1], 0.05),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(
            conversion_diff(Vec::<bool>::new(), vec![true], 0.05),
            Err(Error::EmptyInput)
        );
        assert!(matches!(
            conversion_diff_from_counts(11, 10, 0, 10, 0.05),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn no_effect_large_n() {
        let good = (0..10)
            .filter(|&seed| {
                let a = fixtures::bernoulli(2 * seed, 20000, 0.08);
                let b = fixtures::bernoulli(2 * seed + 1, 20000, 0.08);
                let res = conversion_diff(a, b, 0.05).unwrap();
                res.effect.abs() < 0.01 && res.ci_low <= 0. && 0. <= res.ci_high && res.p_value > 0.01
            })
            .count();
        assert!(good >= 8, "only {} of 10 seeds looked null", good);
    }

    #[test]
    fn detects_effect() {
        let a = fixtures::bernoulli(10, 30000, 0.08);
        let b = fixtures::bernoulli(11, 30000, 0.10);
        let res = conversion_diff(a, b, 0.05).unwrap();
        assert!(res.effect > 0.01);
        assert!(res.ci_low > 0.);
        assert!(res.p_value < 0.01);
    }

    #[test]
    fn from_counts_matches_raw() {
        let raw = conversion_diff(vec![1, 0, 0, 1], vec![1, 1, 1, 0, 0], 0.05).unwrap();
        let counts = conversion_diff_from_counts(2, 4, 3, 5, 0.05).unwrap();
        assert_eq!(raw, counts);
    }
}
