use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop an estimator before it produces a result.
///
/// All of these are raised while validating inputs.  Degenerate-but-valid
/// data (zero variance, everyone converting) is not an error: the estimators
/// handle it with explicit special cases.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A required sample has no observations.
    #[error("Input must contain at least 1 observation")]
    EmptyInput,
    /// A value failed type or domain coercion.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Paired sequences differ in length.
    #[error("{what} must have the same length (got {left} and {right})")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },
    /// The denominator of a ratio is exactly zero.
    #[error("{0} is 0, so the ratio is not defined")]
    UndefinedRatio(&'static str),
    /// An out-of-range configuration value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// A probability outside (0, 1) was passed to a quantile function.
    #[error("p must be between 0 and 1 (exclusive), got {0}")]
    Domain(f64),
}
