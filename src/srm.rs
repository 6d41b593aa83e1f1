use abtk_stats::{srm_check, DEFAULT_SPLIT, DEFAULT_SRM_ALPHA};
use ansi_term::Color;
use anyhow::{bail, Result};
use bpaf::Bpaf;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// An expected traffic split, written `P_A,P_B` (eg. `0.9,0.1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split(pub (f64, f64));

impl FromStr for Split {
    type Err = String;
    fn from_str(x: &str) -> Result<Split, String> {
        let (a, b) = x
            .split_once(',')
            .ok_or_else(|| format!("expected P_A,P_B, got \"{}\"", x))?;
        let parse = |p: &str| {
            p.trim()
                .parse::<f64>()
                .map_err(|e| format!("\"{}\": {}", p, e))
        };
        Ok(Split((parse(a)?, parse(b)?)))
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.0 .0, self.0 .1)
    }
}

#[derive(Debug, Clone, Bpaf)]
pub struct SrmOptions {
    /// The configured split between A and B
    #[bpaf(
        long,
        argument("P_A,P_B"),
        fallback(Split(DEFAULT_SPLIT)),
        display_fallback
    )]
    split: Split,
    /// Significance level
    #[bpaf(long, argument("ALPHA"), fallback(DEFAULT_SRM_ALPHA), display_fallback)]
    alpha: f64,
    /// Print the result as JSON
    json: bool,
    /// Units assigned to A
    #[bpaf(positional("COUNT_A"))]
    count_a: u64,
    /// Units assigned to B
    #[bpaf(positional("COUNT_B"))]
    count_b: u64,
}

/// Fails if the observed split is a mismatch, so scripts can gate on it.
pub fn srm(opts: SrmOptions) -> Result<()> {
    let res = srm_check(opts.count_a, opts.count_b, opts.split.0, opts.alpha)?;
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&res)?);
    } else {
        let mut out = tabwriter::TabWriter::new(std::io::stdout().lock());
        writeln!(out, "\tobserved\texpected")?;
        writeln!(out, "A\t{}\t{:.1}", res.count_a, res.expected_a)?;
        writeln!(out, "B\t{}\t{:.1}", res.count_b, res.expected_b)?;
        writeln!(out, "\nχ² = {:.3}, p = {:.6}", res.chi2, res.p_value)?;
        out.flush()?;
    }
    if res.is_mismatch() {
        bail!(
            "{} (p = {:.3e} < {})",
            Color::Red.paint("Sample ratio mismatch"),
            res.p_value,
            res.alpha
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_split() {
        assert_eq!("0.9,0.1".parse::<Split>(), Ok(Split((0.9, 0.1))));
        assert_eq!(" 0.5 , 0.5 ".parse::<Split>().map(|x| x.0), Ok((0.5, 0.5)));
        assert!("0.5".parse::<Split>().is_err());
        assert!("half,half".parse::<Split>().is_err());
        assert_eq!(Split(DEFAULT_SPLIT).to_string(), "0.5,0.5");
    }
}
