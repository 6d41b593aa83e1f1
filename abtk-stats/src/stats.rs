use crate::error::{Error, Result};
use std::iter::FromIterator;

/// An owned, validated sequence of per-unit observations.
///
/// Whatever the caller hands us (a `Vec`, an iterator, a mapped CSV column)
/// is consumed exactly once into one of these.  A `Sample` is never empty
/// and contains only finite values.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample(Vec<f64>);

#[allow(clippy::len_without_is_empty)]
impl Sample {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Result<Sample> {
        let values = values.into_iter().collect::<Vec<f64>>();
        if values.is_empty() {
            return Err(Error::EmptyInput);
        }
        if let Some(x) = values.iter().find(|x| !x.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "observations must be finite numbers, got {}",
                x
            )));
        }
        Ok(Sample(values))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn mean(&self) -> f64 {
        self.0.iter().sum::<f64>() / self.0.len() as f64
    }

    pub fn stats(&self) -> SampleStats {
        self.0.iter().copied().collect()
    }
}

/// Check that two paired samples have the same number of units.
pub(crate) fn check_paired(what: &'static str, left: &Sample, right: &Sample) -> Result<()> {
    if left.len() != right.len() {
        return Err(Error::LengthMismatch {
            what,
            left: left.len(),
            right: right.len(),
        });
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Moments {
    /// the number of samples seen so far
    count: usize,
    /// the mean of the entire dataset
    mean: f64,
    /// the squared distance from the mean
    m2: f64,
}

impl Moments {
    pub fn update(&mut self, x: f64) {
        // Welford's online algorithm
        self.count += 1;
        let delta1 = x - self.mean; // diff from the old mean
        self.mean += delta1 / self.count as f64;
        let delta2 = x - self.mean; // diff from the new mean
        self.m2 += delta1 * delta2;
    }

    pub fn count(self) -> usize {
        self.count
    }

    pub fn mean(self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.mean
        }
    }

    /// The unbiased sample variance.  With fewer than two observations the
    /// spread is unknown; we call it zero so that downstream arithmetic stays
    /// defined.
    pub fn sample_var(self) -> f64 {
        if self.count <= 1 {
            0.
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }
}

impl Extend<f64> for Moments {
    fn extend<T: IntoIterator<Item = f64>>(&mut self, iter: T) {
        for x in iter {
            self.update(x);
        }
    }
}

/// Joint moments of paired observations `(x, y)`, for the sample covariance.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct CoMoments {
    x: Moments,
    mean_y: f64,
    /// the sum of products of deviations from the two means
    c: f64,
}

impl CoMoments {
    pub fn update(&mut self, x: f64, y: f64) {
        // The bivariate form of Welford's update
        let dx = x - self.x.mean;
        self.x.update(x);
        self.mean_y += (y - self.mean_y) / self.x.count as f64;
        self.c += dx * (y - self.mean_y);
    }

    pub fn count(self) -> usize {
        self.x.count
    }

    /// The unbiased sample covariance, zero with fewer than two pairs.
    pub fn sample_cov(self) -> f64 {
        if self.x.count <= 1 {
            0.
        } else {
            self.c / (self.x.count - 1) as f64
        }
    }

    /// The sample variance of the `x` component alone.
    pub fn sample_var_x(self) -> f64 {
        self.x.sample_var()
    }
}

impl Extend<(f64, f64)> for CoMoments {
    fn extend<T: IntoIterator<Item = (f64, f64)>>(&mut self, iter: T) {
        for (x, y) in iter {
            self.update(x, y);
        }
    }
}

impl FromIterator<(f64, f64)> for CoMoments {
    fn from_iter<T: IntoIterator<Item = (f64, f64)>>(iter: T) -> CoMoments {
        let mut bldr = CoMoments::default();
        bldr.extend(iter);
        bldr
    }
}

/// Summary statistics of one group of units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleStats {
    /// The sample size
    pub count: usize,
    /// The sample mean
    pub mean: f64,
    /// The sample variance
    pub var: f64,
}

impl From<Moments> for SampleStats {
    fn from(x: Moments) -> SampleStats {
        SampleStats {
            count: x.count(),
            mean: x.mean(),
            var: x.sample_var(),
        }
    }
}

impl FromIterator<f64> for SampleStats {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> SampleStats {
        let mut bldr = Moments::default();
        bldr.extend(iter);
        bldr.into()
    }
}

impl SampleStats {
    /// An estimate of the variance of `mean` (which is an estimate of the
    /// population mean), ie. s²/n.
    pub fn mean_var(self) -> f64 {
        self.var / self.count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    #[test]
    fn sample_stats() {
        let stats = vec![1.0_f64, 2., 3.].into_iter().collect::<SampleStats>();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean, 2.);
        assert_eq!(stats.var, 1.);

        let stats = vec![0.0_f64, -2., 2.].into_iter().collect::<SampleStats>();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean, 0.);
        assert_eq!(stats.var, 4.);

        let stats = (0..=100).map(f64::from).collect::<SampleStats>();
        assert_eq!(stats.count, 101);
        assert_eq!(stats.mean, 50.);
        assert_eq!(stats.var, 858.5);
    }

    #[test]
    fn variance_of_tiny_samples_is_zero() {
        let stats = std::iter::once(7.).collect::<SampleStats>();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.mean, 7.);
        assert_eq!(stats.var, 0.);
        assert_eq!(Moments::default().sample_var(), 0.);
        assert!(Moments::default().mean().is_nan());
    }

    #[test]
    fn constant_data_has_exactly_zero_variance() {
        let stats = vec![5.; 1000].into_iter().collect::<SampleStats>();
        assert_eq!(stats.mean, 5.);
        assert_eq!(stats.var, 0.);
    }

    #[test]
    fn covariance() {
        let xs = [1., 2., 3., 4., 5.];
        let ys = [2., 4., 6., 8., 10.];
        let m = xs.iter().copied().zip(ys.iter().copied()).collect::<CoMoments>();
        assert_eq!(m.count(), 5);
        assert_relative_eq!(m.sample_cov(), 5., max_relative = 1e-12);
        assert_relative_eq!(m.sample_var_x(), 2.5, max_relative = 1e-12);

        let anti = xs.iter().copied().zip(ys.iter().map(|y| -y)).collect::<CoMoments>();
        assert_relative_eq!(anti.sample_cov(), -5., max_relative = 1e-12);

        let single = std::iter::once((1., 2.)).collect::<CoMoments>();
        assert_eq!(single.sample_cov(), 0.);
    }

    #[test]
    fn sample_validation() {
        assert_eq!(Sample::new(vec![]), Err(Error::EmptyInput));
        assert!(matches!(
            Sample::new(vec![1., f64::NAN]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Sample::new(vec![f64::INFINITY]),
            Err(Error::InvalidInput(_))
        ));
        let s = Sample::new((1..=4).map(f64::from)).unwrap();
        assert_eq!(s.len(), 4);
        assert_eq!(s.mean(), 2.5);
        assert_eq!(s.as_slice(), &[1., 2., 3., 4.]);
    }

    #[test]
    fn paired_lengths() {
        let a = Sample::new(vec![1., 2.]).unwrap();
        let b = Sample::new(vec![1., 2., 3.]).unwrap();
        assert_eq!(
            check_paired("x and y", &a, &b),
            Err(Error::LengthMismatch {
                what: "x and y",
                left: 2,
                right: 3
            })
        );
        assert_eq!(check_paired("x and y", &a, &a), Ok(()));
    }
}
