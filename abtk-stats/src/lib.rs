/*! Effect estimates, confidence intervals and p-values for A/B tests.

Each estimator takes the raw per-unit observations of a control group (A)
and a treatment group (B) and returns an immutable result record.  The sign
convention is always `effect = B - A`.

## Example

A/B test on a continuous metric (say, minutes on site per visitor):

```
use abtk_stats::*;

let control = vec![1., 2., 3., 4.];
let treatment = vec![3., 5., 7., 9., 11.];

let res = mean_diff(control, treatment, DEFAULT_ALPHA).unwrap();
let msg = format!(
    "Δ = {:+.2} [{:.2}, {:.2}] (p={:.4})",
    res.effect, res.ci_low, res.ci_high, res.p_value,
);
assert_eq!(msg, "Δ = +4.50 [1.45, 7.55] (p=0.0038)");
assert!(res.is_significant());
```

## Approximations

Everything here is tuned for online experiments, where groups have hundreds
to millions of units:

* Tail probabilities use the normal distribution, even where the exact
  distribution would be Student's t (see [`mean::normal_approx_t_cdf`]).
* Closed-form confidence intervals use the fixed critical value [`Z_95`]
  regardless of the `alpha` passed in.  `alpha` still decides
  `is_significant()` and the width of the bootstrap percentile interval.

*/

pub mod chi_squared;
pub mod conversion;
pub mod correction;
pub mod cuped;
mod error;
pub mod health;
pub mod mean;
pub mod normal;
pub mod power;
pub mod ratio;
pub mod stats;

#[cfg(test)]
mod fixtures;

pub use conversion::{conversion_diff, ConversionTestResult, Outcome};
pub use correction::{benjamini_hochberg, bonferroni, holm_bonferroni, Correction};
pub use cuped::{cuped_adjust, cuped_mean_diff, estimate_theta, CupedResult};
pub use error::{Error, Result};
pub use health::{srm_check, SrmResult, DEFAULT_SPLIT};
pub use mean::{mean_diff, MeanTestResult};
pub use power::DEFAULT_POWER;
pub use ratio::{
    ratio_diff, RatioMethod, RatioOptions, RatioTestResult, DEFAULT_BOOTSTRAP_SAMPLES,
    MIN_BOOTSTRAP_SAMPLES,
};
pub use stats::{Sample, SampleStats};

/// The conventional significance level for metric tests.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// The significance level for sample-ratio-mismatch checks.  A mismatch
/// should be rare but decisive, hence much stricter than [`DEFAULT_ALPHA`].
pub const DEFAULT_SRM_ALPHA: f64 = 0.001;

/// The two-sided 95% critical value of the standard normal distribution.
///
/// All closed-form confidence intervals are built as `effect ± Z_95 · SE`,
/// whatever `alpha` the caller asked for.
pub const Z_95: f64 = 1.96;

pub(crate) fn check_alpha(alpha: f64) -> Result<()> {
    if !(alpha > 0. && alpha < 1.) {
        return Err(Error::InvalidParameter(format!(
            "alpha must be between 0 and 1 (exclusive), got {}",
            alpha
        )));
    }
    Ok(())
}

/// Zero standard error means there's no noise left in the data: the observed
/// effect is exact, so it's either certainly zero or certainly not.
pub(crate) fn degenerate_p_value(effect: f64) -> f64 {
    if effect != 0. {
        0.
    } else {
        1.
    }
}
