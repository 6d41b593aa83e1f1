use crate::normal;

/// The survival function P(X ≥ x) of a chi-square distribution with one
/// degree of freedom.
///
/// If Z ~ N(0, 1) then Z² ~ χ²(1), so
///
/// P(χ² ≥ x) = P(|Z| ≥ √x) = 2 · (1 - Φ(√x)).
pub fn sf_df1(x: f64) -> f64 {
    if x < 0. {
        return 1.;
    }
    2. * (1. - normal::cdf(x.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    #[test]
    fn critical_values() {
        // The df=1 critical values at 5% and 1%
        assert_abs_diff_eq!(sf_df1(3.841458820694124), 0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(sf_df1(6.634896601021214), 0.01, epsilon = 1e-12);
    }

    #[test]
    fn edges() {
        assert_eq!(sf_df1(0.), 1.);
        assert_eq!(sf_df1(-3.), 1.);
        assert_eq!(sf_df1(4000.), 0.);
    }

    #[test]
    fn decreasing() {
        let xs = [0.1, 0.5, 1., 2., 5., 10., 20.];
        for w in xs.windows(2) {
            assert!(sf_df1(w[0]) > sf_df1(w[1]));
        }
    }
}
