use crate::groups::parse_number;
use abtk_stats::Correction;
use anyhow::{Context, Result};
use bpaf::Bpaf;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Bpaf)]
pub struct AdjustOptions {
    /// bonferroni, holm or bh
    #[bpaf(long, argument("METHOD"), fallback(Correction::Holm), display_fallback)]
    correction: Correction,
}

/// Reads one p-value per line and prints the adjusted p-values in the same
/// order.  Blank lines are skipped.
pub fn adjust(opts: AdjustOptions) -> Result<()> {
    let p_values = read_p_values(std::io::stdin().lock())?;
    let adjusted = opts.correction.adjust(&p_values)?;
    let mut stdout = std::io::stdout().lock();
    for p in adjusted {
        writeln!(stdout, "{}", p)?;
    }
    Ok(())
}

fn read_p_values(input: impl BufRead) -> Result<Vec<f64>> {
    let mut p_values = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        p_values.push(parse_number(&line).with_context(|| format!("line {}", i + 1))?);
    }
    Ok(p_values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpaf::Parser;

    #[test]
    fn reads_one_per_line() {
        let input = "0.01\n\n 0.2\n0.5\n";
        assert_eq!(read_p_values(input.as_bytes()).unwrap(), vec![0.01, 0.2, 0.5]);
        assert!(read_p_values("0.1\nnope\n".as_bytes()).is_err());
        assert!(read_p_values("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn holm_unless_told_otherwise() {
        let parser = adjust_options().to_options();
        let opts = parser.run_inner(&[] as &[&str]).unwrap();
        assert_eq!(opts.correction, Correction::Holm);
        let opts = parser.run_inner(&["--correction", "bh"][..]).unwrap();
        assert_eq!(opts.correction, Correction::BenjaminiHochberg);
    }
}
