use anyhow::{anyhow, bail, ensure, Context, Result};
use log::*;
use std::fmt;
use std::io::Read;

/// The name of a variant, as it appears in the first CSV column.
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Label(pub String);

impl From<&str> for Label {
    fn from(x: &str) -> Label {
        Label(x.to_string())
    }
}
impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The raw cells of every unit assigned to one variant, column by column.
#[derive(Debug)]
pub struct Arm {
    pub label: Label,
    columns: Vec<Vec<String>>,
}

impl Arm {
    fn new(label: Label, n_metrics: usize) -> Arm {
        Arm {
            label,
            columns: vec![Vec::new(); n_metrics],
        }
    }

    fn push<'a>(&mut self, cells: impl Iterator<Item = &'a str>) {
        for (col, x) in self.columns.iter_mut().zip(cells) {
            col.push(x.to_string());
        }
    }

    /// Parse the `metric`th column (not counting the label column).
    pub fn parse<T>(&self, metric: usize, parse: impl Fn(&str) -> Result<T>) -> Result<Vec<T>> {
        self.columns[metric]
            .iter()
            .enumerate()
            .map(|(i, x)| parse(x).with_context(|| format!("{}, unit {}", self.label, i + 1)))
            .collect()
    }
}

/// Per-unit data split into control and treatment.
#[derive(Debug)]
pub struct Groups {
    /// The names of the columns after the label column
    pub metrics: Vec<String>,
    pub control: Arm,
    pub treatment: Arm,
}

impl Groups {
    /// Check that there are exactly `n` metric columns, and return them.
    pub fn expect_columns(&self, names: &[&str]) -> Result<&[String]> {
        ensure!(
            self.metrics.len() == names.len(),
            "Expected {} columns after the variant label ({}), got {}",
            names.len(),
            names.join(", "),
            self.metrics.len(),
        );
        Ok(&self.metrics)
    }
}

pub fn read_groups(input: impl Read, control: Option<&str>) -> Result<Groups> {
    let mut rdr = csv::Reader::from_reader(input);
    let headers = rdr.headers()?.clone();
    let mut headers = headers.iter();
    let label_col = headers
        .next()
        .ok_or_else(|| anyhow!("The input has no header row"))?;
    info!("Assuming \"{}\" column is the variant label", label_col);
    let metrics = headers.map(|x| x.to_string()).collect::<Vec<_>>();
    ensure!(
        !metrics.is_empty(),
        "Expected at least one metric column after \"{}\"",
        label_col
    );

    let mut arms: Vec<Arm> = Vec::with_capacity(2);
    for (i, row) in rdr.into_records().enumerate() {
        let row = row.with_context(|| format!("Reading row {}", i + 1))?;
        let mut cells = row.iter();
        let label = Label::from(cells.next().unwrap_or(""));
        match arms.iter_mut().find(|arm| arm.label == label) {
            Some(arm) => arm.push(cells),
            None => {
                ensure!(
                    arms.len() < 2,
                    "Found a third variant \"{}\"; only two-arm experiments are supported",
                    label
                );
                let mut arm = Arm::new(label, metrics.len());
                arm.push(cells);
                arms.push(arm);
            }
        }
    }

    let mut arms = arms.into_iter();
    let (mut a, mut b) = match (arms.next(), arms.next()) {
        (Some(a), Some(b)) => (a, b),
        (Some(a), None) => bail!("Only found units for variant \"{}\"", a.label),
        _ => bail!("The input has no units"),
    };
    if let Some(control) = control {
        if b.label.as_ref() == control {
            std::mem::swap(&mut a, &mut b);
        } else if a.label.as_ref() != control {
            bail!("Control variant \"{}\" doesn't appear in the input", control);
        }
    }
    debug!(
        "{} units in control \"{}\", {} in treatment \"{}\"",
        a.columns[0].len(),
        a.label,
        b.columns[0].len(),
        b.label
    );
    Ok(Groups {
        metrics,
        control: a,
        treatment: b,
    })
}

pub fn parse_number(x: &str) -> Result<f64> {
    x.trim()
        .parse()
        .with_context(|| format!("\"{}\" is not a number", x))
}

/// `true`/`false`, or a number (which the estimator will insist is 0 or 1).
pub fn parse_outcome(x: &str) -> Result<f64> {
    match x.trim() {
        "true" => Ok(1.),
        "false" => Ok(0.),
        x => parse_number(x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_label_is_control() {
        let input = "variant,clicks,minutes\nB,1,2.5\nA,0,1\nB,1,3\n";
        let groups = read_groups(input.as_bytes(), None).unwrap();
        assert_eq!(groups.metrics, vec!["clicks", "minutes"]);
        assert_eq!(groups.control.label, Label::from("B"));
        assert_eq!(groups.treatment.label, Label::from("A"));
        assert_eq!(
            groups.control.parse(1, parse_number).unwrap(),
            vec![2.5, 3.]
        );
        assert_eq!(groups.treatment.parse(0, parse_number).unwrap(), vec![0.]);
    }

    #[test]
    fn explicit_control() {
        let input = "variant,clicks\nB,1\nA,0\n";
        let groups = read_groups(input.as_bytes(), Some("A")).unwrap();
        assert_eq!(groups.control.label, Label::from("A"));
        assert_eq!(groups.treatment.label, Label::from("B"));
        assert!(read_groups(input.as_bytes(), Some("C")).is_err());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(read_groups("variant\nA\nB\n".as_bytes(), None).is_err());
        assert!(read_groups("variant,x\nA,1\nA,2\n".as_bytes(), None).is_err());
        assert!(read_groups("variant,x\nA,1\nB,2\nC,3\n".as_bytes(), None).is_err());
        assert!(read_groups("variant,x\nA,1\nB,2,3\n".as_bytes(), None).is_err());

        let groups = read_groups("variant,x\nA,1\nB,oops\n".as_bytes(), None).unwrap();
        assert!(groups.treatment.parse(0, parse_number).is_err());
    }

    #[test]
    fn outcomes() {
        assert_eq!(parse_outcome("true").unwrap(), 1.);
        assert_eq!(parse_outcome(" false ").unwrap(), 0.);
        assert_eq!(parse_outcome("1").unwrap(), 1.);
        assert_eq!(parse_outcome("2").unwrap(), 2.);
        assert!(parse_outcome("yes").is_err());
    }
}
