//! Log-normal sampling parameterized by a median and a dispersion.
//!
//! Durations of disease stages and the sizes of places are right-skewed
//! positive quantities. Both are drawn as `exp(sigma * N(0, 1)) * median`.
//! Models specify the dispersion as a `scatter` in the same unit as the
//! median, read as `sigma = ln((median + scatter) / median)`. `sigma` is
//! derived once and the scatter is not kept.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LogNormal {
    median: f64,
    sigma: f64,
}

impl LogNormal {
    /// # Panics
    ///
    /// Panics if `median` is not positive or `sigma` is negative.
    #[must_use]
    pub fn new(median: f64, sigma: f64) -> LogNormal {
        assert!(median > 0.0, "median {median} must be positive");
        assert!(sigma >= 0.0, "sigma {sigma} must not be negative");
        LogNormal { median, sigma }
    }

    /// Builds the distribution with `sigma = ln((median + scatter) / median)`,
    /// so one standard deviation above the median lands at
    /// `median + scatter`. A scatter of zero gives `sigma = 0` and every draw
    /// equals the median exactly.
    #[must_use]
    pub fn from_scatter(median: f64, scatter: f64) -> LogNormal {
        assert!(scatter >= 0.0, "scatter {scatter} must not be negative");
        LogNormal::new(median, sigma_from_scatter(median, scatter))
    }

    #[must_use]
    pub fn median(&self) -> f64 {
        self.median
    }

    #[must_use]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

fn sigma_from_scatter(median: f64, scatter: f64) -> f64 {
    ((scatter + median) / median).ln()
}

impl Distribution<f64> for LogNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let normal: f64 = rng.sample(StandardNormal);
        (self.sigma * normal).exp() * self.median
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::assert_almost_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn zero_scatter_always_returns_median() {
        let distribution = LogNormal::from_scatter(48.0, 0.0);
        assert_eq!(distribution.sigma(), 0.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(distribution.sample(&mut rng), 48.0);
        }
    }

    #[test]
    fn scatter_sets_one_sigma_point() {
        let distribution = LogNormal::from_scatter(10.0, 4.0);
        assert_almost_eq!(distribution.sigma(), 1.4f64.ln(), 1e-12);
        assert_almost_eq!(distribution.sigma().exp() * 10.0, 14.0, 1e-9);
    }

    #[test]
    fn sigma_is_scale_free() {
        let days = LogNormal::from_scatter(2.0, 0.5);
        let hours = LogNormal::from_scatter(48.0, 12.0);
        assert_almost_eq!(days.sigma(), hours.sigma(), 1e-12);
    }

    #[test]
    fn samples_have_the_requested_median() {
        let distribution = LogNormal::from_scatter(5.0, 3.0);
        let mut rng = StdRng::seed_from_u64(42);
        let mut samples: Vec<f64> = (0..10_001).map(|_| distribution.sample(&mut rng)).collect();
        samples.sort_by(f64::total_cmp);
        assert!(samples.iter().all(|&value| value > 0.0));
        assert!((samples[5_000] - 5.0).abs() < 0.25);
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn rejects_non_positive_median() {
        let _ = LogNormal::new(0.0, 1.0);
    }
}
