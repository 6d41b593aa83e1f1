use crate::groups::*;
use crate::pretty::{report, Estimate, Row};
use abtk_stats::{
    conversion_diff, cuped_mean_diff, mean_diff, ratio_diff, Correction, RatioMethod,
    RatioOptions, DEFAULT_ALPHA, DEFAULT_BOOTSTRAP_SAMPLES,
};
use anyhow::{Context, Result};
use bpaf::Bpaf;
use log::*;

/// Flags shared by every comparison.
#[derive(Debug, Clone, Bpaf)]
pub struct Common {
    /// Significance level
    #[bpaf(long, argument("ALPHA"), fallback(DEFAULT_ALPHA), display_fallback)]
    pub alpha: f64,
    /// The variant to treat as the control (default: the first one in the input)
    #[bpaf(long, argument("LABEL"))]
    pub control: Option<String>,
    /// Print the results as JSON
    pub json: bool,
}

#[derive(Debug, Clone, Bpaf)]
pub struct MetricOptions {
    #[bpaf(external(common))]
    pub common: Common,
    /// Adjust the p-values across metrics: bonferroni, holm or bh
    #[bpaf(long, argument("METHOD"))]
    pub correction: Option<Correction>,
}

#[derive(Debug, Clone, Bpaf)]
pub struct RatioArgs {
    #[bpaf(external(common))]
    pub common: Common,
    /// How to estimate the uncertainty: delta or bootstrap
    #[bpaf(long, argument("METHOD"), fallback(RatioMethod::Delta), display_fallback)]
    pub method: RatioMethod,
    /// The number of bootstrap resamples
    #[bpaf(
        long,
        argument("N"),
        fallback(DEFAULT_BOOTSTRAP_SAMPLES),
        display_fallback
    )]
    pub bootstrap_samples: usize,
    /// Seed for the bootstrap resampler
    #[bpaf(long, argument("SEED"), fallback(0), display_fallback)]
    pub seed: u64,
}

fn read_stdin(common: &Common) -> Result<Groups> {
    read_groups(std::io::stdin().lock(), common.control.as_deref())
}

/// Run one comparison per metric column, then adjust the p-values across them.
fn per_metric<T: Estimate>(
    groups: &Groups,
    correction: Option<Correction>,
    test: impl Fn(usize) -> Result<T>,
) -> Result<Vec<Row<T>>> {
    let mut rows = groups
        .metrics
        .iter()
        .enumerate()
        .map(|(idx, metric)| -> Result<Row<T>> {
            let res = test(idx).with_context(|| format!("Comparing \"{}\"", metric))?;
            Ok(Row::new(metric, res))
        })
        .collect::<Result<Vec<_>>>()?;
    if let Some(correction) = correction {
        let raw = rows.iter().map(|row| row.result.p_value()).collect::<Vec<_>>();
        let adjusted = correction.adjust(&raw)?;
        info!("Adjusted {} p-values with {}", adjusted.len(), correction);
        for (row, p) in rows.iter_mut().zip(adjusted) {
            row.adjusted_p_value = Some(p);
        }
    }
    Ok(rows)
}

pub fn mean(opts: MetricOptions) -> Result<()> {
    let groups = read_stdin(&opts.common)?;
    let rows = per_metric(&groups, opts.correction, |idx| {
        let a = groups.control.parse(idx, parse_number)?;
        let b = groups.treatment.parse(idx, parse_number)?;
        Ok(mean_diff(a, b, opts.common.alpha)?)
    })?;
    report(&groups.control.label, &groups.treatment.label, &rows, opts.common.json)
}

pub fn conversion(opts: MetricOptions) -> Result<()> {
    let groups = read_stdin(&opts.common)?;
    let rows = per_metric(&groups, opts.correction, |idx| {
        let a = groups.control.parse(idx, parse_outcome)?;
        let b = groups.treatment.parse(idx, parse_outcome)?;
        Ok(conversion_diff(a, b, opts.common.alpha)?)
    })?;
    report(&groups.control.label, &groups.treatment.label, &rows, opts.common.json)
}

pub fn ratio(opts: RatioArgs) -> Result<()> {
    let groups = read_stdin(&opts.common)?;
    let columns = groups.expect_columns(&["numerator", "denominator"])?;
    let ratio_opts = RatioOptions {
        method: opts.method,
        bootstrap_samples: opts.bootstrap_samples,
        seed: opts.seed,
        alpha: opts.common.alpha,
    };
    let res = ratio_diff(
        groups.control.parse(0, parse_number)?,
        groups.control.parse(1, parse_number)?,
        groups.treatment.parse(0, parse_number)?,
        groups.treatment.parse(1, parse_number)?,
        &ratio_opts,
    )?;
    let metric = format!("{}/{}", columns[0], columns[1]);
    let rows = [Row::new(&metric, res)];
    report(&groups.control.label, &groups.treatment.label, &rows, opts.common.json)
}

pub fn cuped(opts: Common) -> Result<()> {
    let groups = read_stdin(&opts)?;
    let columns = groups.expect_columns(&["metric", "covariate"])?;
    let res = cuped_mean_diff(
        groups.control.parse(0, parse_number)?,
        groups.treatment.parse(0, parse_number)?,
        groups.control.parse(1, parse_number)?,
        groups.treatment.parse(1, parse_number)?,
        opts.alpha,
    )?;
    info!(
        "Unadjusted means: {:.4} and {:.4}",
        res.baseline_mean_a, res.baseline_mean_b
    );
    let rows = [Row::new(&columns[0], res)];
    report(&groups.control.label, &groups.treatment.label, &rows, opts.json)?;
    if !opts.json {
        println!("\nθ = {:.4}", res.theta);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use abtk_stats::holm_bonferroni;

    const TWO_METRICS: &str = "variant,x,y\nA,1,2\nA,2,3\nA,3,5\nB,4,1\nB,5,2\nB,7,2\n";

    fn mean_rows(groups: &Groups, correction: Option<Correction>) -> Result<Vec<Row<impl Estimate + std::fmt::Debug>>> {
        per_metric(groups, correction, |idx| {
            let a = groups.control.parse(idx, parse_number)?;
            let b = groups.treatment.parse(idx, parse_number)?;
            Ok(mean_diff(a, b, DEFAULT_ALPHA)?)
        })
    }

    #[test]
    fn adjusts_across_metrics() {
        let groups = read_groups(TWO_METRICS.as_bytes(), None).unwrap();
        let rows = mean_rows(&groups, Some(Correction::Holm)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].metric, "x");
        assert_eq!(rows[1].metric, "y");
        let raw = rows.iter().map(|row| row.result.p_value()).collect::<Vec<_>>();
        let expected = holm_bonferroni(&raw).unwrap();
        for (row, p) in rows.iter().zip(expected) {
            assert_eq!(row.adjusted_p_value, Some(p));
            assert!(p >= row.result.p_value());
        }
    }

    #[test]
    fn no_correction_leaves_raw_p_values() {
        let groups = read_groups(TWO_METRICS.as_bytes(), None).unwrap();
        let rows = mean_rows(&groups, None).unwrap();
        assert!(rows.iter().all(|row| row.adjusted_p_value.is_none()));
    }

    #[test]
    fn failing_metric_is_named() {
        let groups = read_groups("variant,x,y\nA,1,2\nA,2,x\nB,4,1\nB,5,2\n".as_bytes(), None).unwrap();
        let err = mean_rows(&groups, None).unwrap_err();
        assert!(format!("{:#}", err).contains("Comparing \"y\""));
    }

    #[test]
    fn paired_columns_are_counted() {
        let three = read_groups("variant,n,d,extra\nA,1,2,3\nB,1,2,3\n".as_bytes(), None).unwrap();
        assert!(three.expect_columns(&["numerator", "denominator"]).is_err());
        assert!(three.expect_columns(&["metric", "covariate"]).is_err());
        let two = read_groups("variant,n,d\nA,1,2\nB,1,2\n".as_bytes(), None).unwrap();
        assert_eq!(
            two.expect_columns(&["numerator", "denominator"]).unwrap(),
            &["n".to_string(), "d".to_string()]
        );
    }
}
