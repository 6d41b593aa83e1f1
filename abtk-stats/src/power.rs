//! Planning: how many units does an experiment need, and how likely is it to
//! detect a given effect?
//!
//! Everything here uses the normal approximation, which is standard for the
//! group sizes of online experiments.  Sample sizes are always per group.

use crate::error::{Error, Result};
use crate::{check_alpha, normal};

/// The conventional target power.
pub const DEFAULT_POWER: f64 = 0.8;

fn check_rates(baseline_rate: f64, mde: f64) -> Result<(f64, f64)> {
    let p1 = baseline_rate;
    let p2 = baseline_rate + mde;
    let in_unit = |p: f64| p > 0. && p < 1.;
    if !in_unit(p1) || !in_unit(p2) {
        return Err(Error::InvalidParameter(format!(
            "rates must be between 0 and 1 (exclusive), got {} and {}",
            p1, p2
        )));
    }
    Ok((p1, p2))
}

fn check_mde(mde: f64) -> Result<()> {
    if mde == 0. || !mde.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "minimum detectable effect must be non-zero, got {}",
            mde
        )));
    }
    Ok(())
}

fn check_power(power: f64) -> Result<()> {
    if !(power > 0. && power < 1.) {
        return Err(Error::InvalidParameter(format!(
            "power must be between 0 and 1 (exclusive), got {}",
            power
        )));
    }
    Ok(())
}

fn check_sd(sd: f64) -> Result<()> {
    if !(sd > 0. && sd.is_finite()) {
        return Err(Error::InvalidParameter(format!(
            "standard deviation must be positive, got {}",
            sd
        )));
    }
    Ok(())
}

fn check_n(n: u64) -> Result<()> {
    if n == 0 {
        return Err(Error::InvalidParameter("n_per_group must be positive".into()));
    }
    Ok(())
}

/// The two-sided critical value for significance level `alpha`.
fn z_alpha(alpha: f64) -> Result<f64> {
    check_alpha(alpha)?;
    normal::inv_cdf(1. - alpha / 2.)
}

/// The power of a two-sided z-test whose statistic is centred on `mean_z`.
fn two_sided_power(z_alpha: f64, mean_z: f64) -> f64 {
    let upper = 1. - normal::cdf(z_alpha - mean_z);
    let lower = normal::cdf(-z_alpha - mean_z);
    (upper + lower).clamp(0., 1.)
}

/// Units per group needed to detect an absolute lift of `mde` over
/// `baseline_rate` with the given power.
///
/// ```
/// # use abtk_stats::power::*;
/// // 8% → 9% conversion, at α=0.05 and 80% power
/// assert_eq!(sample_size_two_proportions(0.08, 0.01, 0.05, DEFAULT_POWER).unwrap(), 12208);
/// ```
pub fn sample_size_two_proportions(
    baseline_rate: f64,
    mde: f64,
    alpha: f64,
    power: f64,
) -> Result<u64> {
    let (p1, p2) = check_rates(baseline_rate, mde)?;
    check_mde(mde)?;
    check_power(power)?;
    let z_alpha = z_alpha(alpha)?;
    let z_power = normal::inv_cdf(power)?;

    let p_bar = (p1 + p2) / 2.;
    let numerator = z_alpha * (2. * p_bar * (1. - p_bar)).sqrt()
        + z_power * (p1 * (1. - p1) + p2 * (1. - p2)).sqrt();
    let n = numerator.powi(2) / (p2 - p1).powi(2);
    Ok(n.ceil() as u64)
}

/// The probability of detecting an absolute lift of `mde` over
/// `baseline_rate`, with `n_per_group` units in each group.
pub fn power_two_proportions(
    baseline_rate: f64,
    mde: f64,
    n_per_group: u64,
    alpha: f64,
) -> Result<f64> {
    let (p1, p2) = check_rates(baseline_rate, mde)?;
    check_n(n_per_group)?;
    let z_alpha = z_alpha(alpha)?;

    let standard_error = ((p1 * (1. - p1) + p2 * (1. - p2)) / n_per_group as f64).sqrt();
    Ok(two_sided_power(z_alpha, (p2 - p1) / standard_error))
}

/// Units per group needed to detect a shift of `mde` in the mean of a
/// metric with standard deviation `standard_deviation`.
pub fn sample_size_two_means(
    standard_deviation: f64,
    mde: f64,
    alpha: f64,
    power: f64,
) -> Result<u64> {
    check_sd(standard_deviation)?;
    check_mde(mde)?;
    check_power(power)?;
    let z_alpha = z_alpha(alpha)?;
    let z_power = normal::inv_cdf(power)?;

    // The standard error of the difference is √(2σ²/n); solve for n.
    let n = (z_alpha + z_power).powi(2) * 2. * standard_deviation.powi(2) / mde.powi(2);
    Ok(n.ceil() as u64)
}

pub fn power_two_means(
    standard_deviation: f64,
    mde: f64,
    n_per_group: u64,
    alpha: f64,
) -> Result<f64> {
    check_sd(standard_deviation)?;
    check_mde(mde)?;
    check_n(n_per_group)?;
    let z_alpha = z_alpha(alpha)?;

    let standard_error = (2. * standard_deviation.powi(2) / n_per_group as f64).sqrt();
    Ok(two_sided_power(z_alpha, mde / standard_error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_ALPHA;
    use approx::*;

    #[test]
    fn sample_size_means() {
        assert_eq!(sample_size_two_means(10., 1., DEFAULT_ALPHA, DEFAULT_POWER), Ok(1570));
        // Halving the effect quadruples the sample size
        assert_eq!(sample_size_two_means(10., 0.5, DEFAULT_ALPHA, DEFAULT_POWER), Ok(6280));
        // The sign of the effect doesn't matter
        assert_eq!(sample_size_two_means(10., -1., DEFAULT_ALPHA, DEFAULT_POWER), Ok(1570));
    }

    #[test]
    fn sample_size_proportions() {
        assert_eq!(
            sample_size_two_proportions(0.08, 0.01, DEFAULT_ALPHA, DEFAULT_POWER),
            Ok(12208)
        );
        assert_eq!(
            sample_size_two_proportions(0.08, 0.005, DEFAULT_ALPHA, DEFAULT_POWER),
            Ok(47528)
        );
    }

    #[test]
    fn power_means() {
        let small = power_two_means(10., 1., 200, DEFAULT_ALPHA).unwrap();
        let large = power_two_means(10., 1., 2000, DEFAULT_ALPHA).unwrap();
        assert_relative_eq!(small, 0.17007504534754997, max_relative = 1e-9);
        assert_relative_eq!(large, 0.8853791404563601, max_relative = 1e-9);
        assert!(small < large);

        // The planned sample size achieves the planned power
        let n = sample_size_two_means(10., 1., DEFAULT_ALPHA, DEFAULT_POWER).unwrap();
        assert_abs_diff_eq!(power_two_means(10., 1., n, DEFAULT_ALPHA).unwrap(), 0.8, epsilon = 1e-3);
    }

    #[test]
    fn power_proportions() {
        let small = power_two_proportions(0.08, 0.01, 2000, DEFAULT_ALPHA).unwrap();
        let large = power_two_proportions(0.08, 0.01, 20000, DEFAULT_ALPHA).unwrap();
        assert_relative_eq!(small, 0.20542666633348133, max_relative = 1e-9);
        assert_relative_eq!(large, 0.9480637132228085, max_relative = 1e-9);
        let n = sample_size_two_proportions(0.08, 0.01, DEFAULT_ALPHA, DEFAULT_POWER).unwrap();
        assert!(power_two_proportions(0.08, 0.01, n, DEFAULT_ALPHA).unwrap() >= 0.79);
    }

    #[test]
    fn rejects_bad_parameters() {
        let invalid = |r: Result<u64>| matches!(r, Err(Error::InvalidParameter(_)));
        assert!(invalid(sample_size_two_proportions(0., 0.01, 0.05, 0.8)));
        assert!(invalid(sample_size_two_proportions(0.995, 0.01, 0.05, 0.8)));
        assert!(invalid(sample_size_two_proportions(0.08, 0., 0.05, 0.8)));
        assert!(invalid(sample_size_two_proportions(0.08, 0.01, 0.05, 1.)));
        assert!(invalid(sample_size_two_proportions(0.08, 0.01, 0., 0.8)));
        assert!(invalid(sample_size_two_means(0., 1., 0.05, 0.8)));
        assert!(invalid(sample_size_two_means(-1., 1., 0.05, 0.8)));
        assert!(invalid(sample_size_two_means(10., 0., 0.05, 0.8)));
        assert!(invalid(sample_size_two_means(10., 1., 0.05, 0.)));

        let invalid = |r: Result<f64>| matches!(r, Err(Error::InvalidParameter(_)));
        assert!(invalid(power_two_proportions(0.08, 0.01, 0, 0.05)));
        assert!(invalid(power_two_proportions(0.08, -0.09, 100, 0.05)));
        assert!(invalid(power_two_means(10., 1., 0, 0.05)));
        assert!(invalid(power_two_means(f64::NAN, 1., 100, 0.05)));
        assert!(invalid(power_two_means(10., 0., 100, 0.05)));
        assert!(invalid(power_two_means(10., 1., 100, 1.)));
    }
}
