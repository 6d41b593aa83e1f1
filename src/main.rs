mod adjust;
mod analyze;
mod groups;
mod plan;
mod pretty;
mod srm;

use adjust::{adjust_options, AdjustOptions};
use analyze::{common, metric_options, ratio_args, Common, MetricOptions, RatioArgs};
use bpaf::Bpaf;
use plan::{plan_options, PlanOptions};
use srm::{srm_options, SrmOptions};

/// Analyze two-arm online experiments.
///
/// Per-unit data is read as CSV on stdin.  The first column labels the
/// variant of each unit; the first label seen is the control unless
/// --control says otherwise.
#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version)]
enum Subcommand {
    /// Compare the means of one or more continuous metrics (Welch's test)
    #[bpaf(command)]
    Mean(#[bpaf(external(metric_options))] MetricOptions),
    /// Compare one or more conversion rates (cells are 0/1/true/false)
    #[bpaf(command)]
    Conversion(#[bpaf(external(metric_options))] MetricOptions),
    /// Compare a ratio metric given as `variant,numerator,denominator`
    #[bpaf(command)]
    Ratio(#[bpaf(external(ratio_args))] RatioArgs),
    /// Compare a metric after CUPED adjustment, given as `variant,metric,covariate`
    #[bpaf(command)]
    Cuped(#[bpaf(external(common))] Common),
    /// Check the traffic split for a sample ratio mismatch
    #[bpaf(command)]
    Srm(#[bpaf(external(srm_options))] SrmOptions),
    /// Adjust p-values (one per line on stdin) for multiple testing
    #[bpaf(command)]
    Adjust(#[bpaf(external(adjust_options))] AdjustOptions),
    /// Plan the size of an experiment, or its power
    #[bpaf(command)]
    Plan(#[bpaf(external(plan_options))] PlanOptions),
}

fn main() {
    env_logger::init();
    let result = match subcommand().run() {
        Subcommand::Mean(opts) => analyze::mean(opts),
        Subcommand::Conversion(opts) => analyze::conversion(opts),
        Subcommand::Ratio(opts) => analyze::ratio(opts),
        Subcommand::Cuped(opts) => analyze::cuped(opts),
        Subcommand::Srm(opts) => srm::srm(opts),
        Subcommand::Adjust(opts) => adjust::adjust(opts),
        Subcommand::Plan(opts) => plan::plan(opts),
    };
    if let Err(e) = result {
        // Ignore EPIPE
        if let Some(e) = e.downcast_ref::<std::io::Error>() {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return;
            }
        }
        eprintln!("Error: {:#}", e);
        std::process::exit(1)
    }
}
