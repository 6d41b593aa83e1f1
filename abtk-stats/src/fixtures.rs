//! Deterministic synthetic experiment data for tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

pub fn normal(seed: u64, n: usize, mean: f64, sd: f64) -> Vec<f64> {
    let rng = ChaCha8Rng::seed_from_u64(seed);
    Normal::new(mean, sd)
        .unwrap()
        .sample_iter(rng)
        .take(n)
        .collect()
}

pub fn bernoulli(seed: u64, n: usize, p: f64) -> Vec<bool> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_bool(p)).collect()
}

/// Revenue per visitor: most spend nothing, a fraction `p` spend `amount`.
pub fn revenue(seed: u64, n: usize, p: f64, amount: f64) -> Vec<f64> {
    bernoulli(seed, n, p)
        .into_iter()
        .map(|bought| if bought { amount } else { 0. })
        .collect()
}
