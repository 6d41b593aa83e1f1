use crate::groups::Label;
use abtk_stats::{ConversionTestResult, CupedResult, MeanTestResult, RatioTestResult};
use ansi_term::Color;
use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::io::Write;

/// The parts of a test result that get printed in the table.
pub trait Estimate: Serialize {
    /// The compared value in (control, treatment)
    fn arms(&self) -> (f64, f64);
    fn effect(&self) -> f64;
    fn ci(&self) -> (f64, f64);
    fn p_value(&self) -> f64;
    fn alpha(&self) -> f64;
}

macro_rules! estimate {
    ($t:ty, $a:ident, $b:ident) => {
        impl Estimate for $t {
            fn arms(&self) -> (f64, f64) {
                (self.$a, self.$b)
            }
            fn effect(&self) -> f64 {
                self.effect
            }
            fn ci(&self) -> (f64, f64) {
                (self.ci_low, self.ci_high)
            }
            fn p_value(&self) -> f64 {
                self.p_value
            }
            fn alpha(&self) -> f64 {
                self.alpha
            }
        }
    };
}
estimate!(MeanTestResult, mean_a, mean_b);
estimate!(ConversionTestResult, rate_a, rate_b);
estimate!(RatioTestResult, ratio_a, ratio_b);
estimate!(CupedResult, adjusted_mean_a, adjusted_mean_b);

#[derive(Debug, Serialize)]
pub struct Row<T> {
    pub metric: String,
    #[serde(flatten)]
    pub result: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_p_value: Option<f64>,
}

impl<T: Estimate> Row<T> {
    pub fn new(metric: &str, result: T) -> Row<T> {
        Row {
            metric: metric.to_string(),
            result,
            adjusted_p_value: None,
        }
    }

    /// The p-value that decides significance.
    fn p_value(&self) -> f64 {
        self.adjusted_p_value
            .unwrap_or_else(|| self.result.p_value())
    }
}

pub fn report<T: Estimate>(
    control: &Label,
    treatment: &Label,
    rows: &[Row<T>],
    json: bool,
) -> Result<()> {
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    if json {
        let out = json!({
            "control": control.as_ref(),
            "treatment": treatment.as_ref(),
            "results": rows,
        });
        writeln!(stdout, "{}", serde_json::to_string_pretty(&out)?)?;
        return Ok(());
    }

    let adjusted = rows.iter().any(|row| row.adjusted_p_value.is_some());
    let mut out = tabwriter::TabWriter::new(stdout);
    write!(out, "metric\t{}\t{}\teffect\tCI\tp", control, treatment)?;
    if adjusted {
        write!(out, "\tadj. p")?;
    }
    writeln!(out)?;
    for row in rows {
        let (a, b) = row.result.arms();
        let (low, high) = row.result.ci();
        let effect = PrettyEffect {
            effect: row.result.effect(),
            p_value: row.p_value(),
            alpha: row.result.alpha(),
        };
        write!(
            out,
            "{}\t{:.4}\t{:.4}\t{}\t[{:+.4}, {:+.4}]\t{}",
            row.metric,
            a,
            b,
            effect,
            low,
            high,
            PrettyP(row.result.p_value()),
        )?;
        if let Some(p) = row.adjusted_p_value {
            write!(out, "\t{}", PrettyP(p))?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Coloured yellow when significant at `alpha`, red when significant at
/// `alpha / 10`.
pub struct PrettyEffect {
    pub effect: f64,
    pub p_value: f64,
    pub alpha: f64,
}

impl fmt::Display for PrettyEffect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let center = format!("{:+.4}", self.effect);
        let color = if self.p_value < self.alpha / 10. {
            Color::Red
        } else if self.p_value < self.alpha {
            Color::Yellow
        } else {
            return f.write_str(&center);
        };
        write!(f, "{}{}{}", color.prefix(), center, color.suffix())
    }
}

pub struct PrettyP(pub f64);

impl fmt::Display for PrettyP {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0 < 1e-4 {
            f.write_str("<0.0001")
        } else {
            write!(f, "{:.4}", self.0)
        }
    }
}
