/*! Variance reduction with pre-experiment covariates (CUPED).

Much of the noise in a metric like "revenue per visitor" is predictable: the
visitors who spent a lot last week will probably spend a lot this week,
whichever variant they're in.  If we have a per-unit covariate measured
*before* assignment, we can subtract the part of the metric it predicts:

```text
adjusted_i = metric_i - θ · (covariate_i - mean(covariate))
```

with θ = Cov(metric, covariate) / Var(covariate).  Because the covariate is
independent of assignment, this leaves the expected effect unchanged, and
shrinks the variance by a factor of 1 - ρ².
*/

use crate::error::Result;
use crate::mean::mean_diff;
use crate::stats::{check_paired, CoMoments, Sample};
use crate::check_alpha;
use log::*;
use serde::Serialize;

/// A Welch comparison of the CUPED-adjusted metric, with the adjustment that
/// produced it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CupedResult {
    pub theta: f64,
    /// Means of the unadjusted metric
    pub baseline_mean_a: f64,
    pub baseline_mean_b: f64,
    pub adjusted_mean_a: f64,
    pub adjusted_mean_b: f64,
    pub n_a: usize,
    pub n_b: usize,
    /// `adjusted_mean_b - adjusted_mean_a`
    pub effect: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    pub df: f64,
    pub p_value: f64,
    pub alpha: f64,
}

impl CupedResult {
    pub fn is_significant(&self) -> bool {
        self.p_value < self.alpha
    }
}

/// The variance-minimizing coefficient θ = Cov(metric, covariate) / Var(covariate).
///
/// A constant covariate can't explain anything, so θ is 0 in that case.
pub fn estimate_theta(metric: &[f64], covariate: &[f64]) -> Result<f64> {
    let metric = Sample::new(metric.iter().copied())?;
    let covariate = Sample::new(covariate.iter().copied())?;
    check_paired("metric and covariate", &metric, &covariate)?;
    Ok(theta(
        covariate
            .as_slice()
            .iter()
            .copied()
            .zip(metric.as_slice().iter().copied())
            .collect(),
    ))
}

/// θ from the joint moments of `(covariate, metric)` pairs.
fn theta(moments: CoMoments) -> f64 {
    let var = moments.sample_var_x();
    if var == 0. {
        debug!("The covariate is constant; CUPED can't reduce variance");
        return 0.;
    }
    let theta = moments.sample_cov() / var;
    trace!("CUPED θ = {} from {} units", theta, moments.count());
    theta
}

/// Adjust a metric by its covariate.
///
/// If `theta` is `None` it's estimated from the same data.  Returns the
/// adjusted metric along with the θ that was used.
pub fn cuped_adjust(
    metric: impl IntoIterator<Item = f64>,
    covariate: impl IntoIterator<Item = f64>,
    theta: Option<f64>,
) -> Result<(Vec<f64>, f64)> {
    let metric = Sample::new(metric)?;
    let covariate = Sample::new(covariate)?;
    check_paired("metric and covariate", &metric, &covariate)?;
    let theta = match theta {
        Some(theta) => theta,
        None => self::theta(paired(&covariate, &metric).collect()),
    };
    Ok((adjust(&metric, &covariate, theta), theta))
}

fn paired<'a>(x: &'a Sample, y: &'a Sample) -> impl Iterator<Item = (f64, f64)> + 'a {
    x.as_slice().iter().copied().zip(y.as_slice().iter().copied())
}

fn adjust(metric: &Sample, covariate: &Sample, theta: f64) -> Vec<f64> {
    let mean_covariate = covariate.mean();
    paired(metric, covariate)
        .map(|(m, c)| m - theta * (c - mean_covariate))
        .collect()
}

/// Compare the means of groups A and B after CUPED adjustment.
///
/// A single θ is fitted on both groups pooled together and applied to each
/// of them, so that the two arms get the same linear adjustment.
pub fn cuped_mean_diff(
    metric_a: impl IntoIterator<Item = f64>,
    metric_b: impl IntoIterator<Item = f64>,
    covariate_a: impl IntoIterator<Item = f64>,
    covariate_b: impl IntoIterator<Item = f64>,
    alpha: f64,
) -> Result<CupedResult> {
    check_alpha(alpha)?;
    let metric_a = Sample::new(metric_a)?;
    let metric_b = Sample::new(metric_b)?;
    let covariate_a = Sample::new(covariate_a)?;
    let covariate_b = Sample::new(covariate_b)?;
    check_paired("Group A metric and covariate", &metric_a, &covariate_a)?;
    check_paired("Group B metric and covariate", &metric_b, &covariate_b)?;

    let theta = theta(
        paired(&covariate_a, &metric_a)
            .chain(paired(&covariate_b, &metric_b))
            .collect(),
    );
    let adjusted_a = adjust(&metric_a, &covariate_a, theta);
    let adjusted_b = adjust(&metric_b, &covariate_b, theta);
    let res = mean_diff(adjusted_a, adjusted_b, alpha)?;

    Ok(CupedResult {
        theta,
        baseline_mean_a: metric_a.mean(),
        baseline_mean_b: metric_b.mean(),
        adjusted_mean_a: res.mean_a,
        adjusted_mean_b: res.mean_b,
        n_a: res.n_a,
        n_b: res.n_b,
        effect: res.effect,
        ci_low: res.ci_low,
        ci_high: res.ci_high,
        df: res.df,
        p_value: res.p_value,
        alpha,
    })
}
