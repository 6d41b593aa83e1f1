//! Adjusting p-values when several metrics are tested at once.
//!
//! Test twenty metrics at α=0.05 and you should expect one of them to light
//! up by chance alone.  These procedures turn a family of raw p-values into
//! adjusted ones which can be compared against the usual α.
//!
//! * [`bonferroni`] and [`holm_bonferroni`] control the family-wise error
//!   rate (the chance of *any* false positive).  Holm is uniformly more
//!   powerful.
//! * [`benjamini_hochberg`] controls the false discovery rate (the expected
//!   share of false positives among the metrics you call significant).
//!
//! Adjusted p-values always come back in the same order as the input.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A multiple-testing procedure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Correction {
    Bonferroni,
    Holm,
    BenjaminiHochberg,
}

impl Correction {
    pub fn adjust(self, p_values: &[f64]) -> Result<Vec<f64>> {
        match self {
            Correction::Bonferroni => bonferroni(p_values),
            Correction::Holm => holm_bonferroni(p_values),
            Correction::BenjaminiHochberg => benjamini_hochberg(p_values),
        }
    }
}

impl FromStr for Correction {
    type Err = Error;
    fn from_str(x: &str) -> Result<Correction> {
        match x.to_ascii_lowercase().as_str() {
            "bonferroni" => Ok(Correction::Bonferroni),
            "holm" | "holm-bonferroni" => Ok(Correction::Holm),
            "bh" | "benjamini-hochberg" => Ok(Correction::BenjaminiHochberg),
            _ => Err(Error::InvalidParameter(format!(
                "unknown correction '{}' (expected bonferroni, holm or bh)",
                x
            ))),
        }
    }
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Correction::Bonferroni => f.write_str("bonferroni"),
            Correction::Holm => f.write_str("holm"),
            Correction::BenjaminiHochberg => f.write_str("benjamini-hochberg"),
        }
    }
}

fn check_p_values(p_values: &[f64]) -> Result<()> {
    if p_values.is_empty() {
        return Err(Error::InvalidInput(
            "p_values must contain at least 1 value".into(),
        ));
    }
    if let Some(p) = p_values.iter().find(|p| !(0. ..=1.).contains(*p)) {
        return Err(Error::InvalidInput(format!(
            "p-values must be between 0 and 1, got {}",
            p
        )));
    }
    Ok(())
}

/// `min(1, p·m)` for each of the `m` p-values.
pub fn bonferroni(p_values: &[f64]) -> Result<Vec<f64>> {
    check_p_values(p_values)?;
    let m = p_values.len() as f64;
    Ok(p_values.iter().map(|p| (p * m).min(1.)).collect())
}

/// Holm's step-down procedure.
pub fn holm_bonferroni(p_values: &[f64]) -> Result<Vec<f64>> {
    check_p_values(p_values)?;
    let m = p_values.len();
    let order = ascending(p_values);

    let mut adjusted = vec![0.; m];
    let mut running_max = 0f64;
    for (rank, &i) in order.iter().enumerate() {
        // rank is 0-based here, so the multiplier m - rank + 1 becomes m - rank
        let x = (p_values[i] * (m - rank) as f64).min(1.);
        running_max = running_max.max(x);
        adjusted[i] = running_max;
    }
    Ok(adjusted)
}

/// The Benjamini–Hochberg step-up procedure.
pub fn benjamini_hochberg(p_values: &[f64]) -> Result<Vec<f64>> {
    check_p_values(p_values)?;
    let m = p_values.len();
    let order = ascending(p_values);

    let mut adjusted = vec![0.; m];
    let mut running_min = 1f64;
    for (rank, &i) in order.iter().enumerate().rev() {
        let x = (p_values[i] * m as f64 / (rank + 1) as f64).min(1.);
        running_min = running_min.min(x);
        adjusted[i] = running_min;
    }
    Ok(adjusted)
}

/// Indices of `p_values` in ascending order.  Ties keep their input order.
fn ascending(p_values: &[f64]) -> Vec<usize> {
    let mut order = (0..p_values.len()).collect::<Vec<_>>();
    // sort_by is stable
    order.sort_by(|&i, &j| p_values[i].total_cmp(&p_values[j]));
    order
}
