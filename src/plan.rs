use abtk_stats::power::*;
use abtk_stats::DEFAULT_ALPHA;
use anyhow::{bail, Result};
use bpaf::Bpaf;
use log::*;
use std::fmt;

#[derive(Debug, Clone, Bpaf)]
pub struct PlanOptions {
    /// Baseline conversion rate, for a conversion metric
    #[bpaf(long, argument("RATE"))]
    baseline: Option<f64>,
    /// Per-unit standard deviation, for a continuous metric
    #[bpaf(long, argument("SIGMA"))]
    sd: Option<f64>,
    /// The smallest absolute effect worth detecting
    #[bpaf(long, argument("D"))]
    mde: f64,
    /// Report the power of an experiment with this many units per group,
    /// instead of the required sample size
    #[bpaf(long, argument("N"))]
    per_group: Option<u64>,
    /// Significance level
    #[bpaf(long, argument("ALPHA"), fallback(DEFAULT_ALPHA), display_fallback)]
    alpha: f64,
    /// Target power
    #[bpaf(long, argument("P"), fallback(DEFAULT_POWER), display_fallback)]
    power: f64,
}

enum Metric {
    Conversion { baseline: f64 },
    Continuous { sd: f64 },
}

#[derive(Debug, PartialEq)]
enum Plan {
    /// Units needed in each group to reach the target power
    SampleSize(u64),
    /// Power of the experiment at the given group size
    Power(f64),
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Plan::SampleSize(n) => {
                write!(f, "{} units per group ({} total)", n, n.saturating_mul(2))
            }
            Plan::Power(power) => write!(f, "power: {:.1}%", power * 100.),
        }
    }
}

fn evaluate(opts: &PlanOptions) -> Result<Plan> {
    let metric = match (opts.baseline, opts.sd) {
        (Some(baseline), None) => Metric::Conversion { baseline },
        (None, Some(sd)) => Metric::Continuous { sd },
        _ => bail!("Pass exactly one of --baseline (conversion) or --sd (continuous)"),
    };
    debug!("α={}, power={}", opts.alpha, opts.power);
    Ok(match opts.per_group {
        Some(n) => Plan::Power(match metric {
            Metric::Conversion { baseline } => {
                power_two_proportions(baseline, opts.mde, n, opts.alpha)?
            }
            Metric::Continuous { sd } => power_two_means(sd, opts.mde, n, opts.alpha)?,
        }),
        None => Plan::SampleSize(match metric {
            Metric::Conversion { baseline } => {
                sample_size_two_proportions(baseline, opts.mde, opts.alpha, opts.power)?
            }
            Metric::Continuous { sd } => {
                sample_size_two_means(sd, opts.mde, opts.alpha, opts.power)?
            }
        }),
    })
}

pub fn plan(opts: PlanOptions) -> Result<()> {
    println!("{}", evaluate(&opts)?);
    Ok(())
}
