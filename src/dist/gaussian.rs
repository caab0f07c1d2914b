//! Normal increments for the rate random walk
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use rand::Rng;
use rand_distr::Normal;
use std::fmt;

use crate::impl_display;
use crate::traits::Sampleable;

/// [Normal distribution](https://en.wikipedia.org/wiki/Normal_distribution),
/// N(μ, σ). The rate proposals add a `N(0, scale)` step to the current rate.
///
/// # Example
///
/// ```
/// use rand::SeedableRng;
/// use switchpoint::prelude::*;
///
/// let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(3);
/// let step = Gaussian::new(0.0, 0.5).unwrap();
/// let x: f64 = step.draw(&mut rng);
/// assert!(x.is_finite());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct Gaussian {
    mu: f64,
    sigma: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum GaussianError {
    /// mu is infinite or NaN
    MuNotFinite { mu: f64 },
    /// sigma is zero or negative
    SigmaTooLow { sigma: f64 },
    /// sigma is infinite or NaN
    SigmaNotFinite { sigma: f64 },
}

impl Gaussian {
    pub fn new(mu: f64, sigma: f64) -> Result<Self, GaussianError> {
        if !mu.is_finite() {
            Err(GaussianError::MuNotFinite { mu })
        } else if sigma <= 0.0 {
            Err(GaussianError::SigmaTooLow { sigma })
        } else if !sigma.is_finite() {
            Err(GaussianError::SigmaNotFinite { sigma })
        } else {
            Ok(Gaussian { mu, sigma })
        }
    }

    /// No validation. Proposal scales are clamped positive before they get
    /// here.
    #[inline]
    pub fn new_unchecked(mu: f64, sigma: f64) -> Self {
        Gaussian { mu, sigma }
    }

    #[inline]
    pub fn mu(&self) -> f64 {
        self.mu
    }

    #[inline]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    fn sampler(&self) -> Normal<f64> {
        // mu is finite and sigma positive for any constructed Gaussian
        Normal::new(self.mu, self.sigma).unwrap()
    }
}

impl From<&Gaussian> for String {
    fn from(gauss: &Gaussian) -> String {
        format!("N(μ: {}, σ: {})", gauss.mu, gauss.sigma)
    }
}

impl_display!(Gaussian);

impl Sampleable<f64> for Gaussian {
    fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.sample(self.sampler())
    }

    fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        rng.sample_iter(self.sampler()).take(n).collect()
    }
}

impl std::error::Error for GaussianError {}

impl fmt::Display for GaussianError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MuNotFinite { mu } => write!(f, "non-finite mu: {}", mu),
            Self::SigmaTooLow { sigma } => {
                write!(f, "sigma ({}) must be greater than zero", sigma)
            }
            Self::SigmaNotFinite { sigma } => {
                write!(f, "non-finite sigma: {}", sigma)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_basic_impls;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    test_basic_impls!(Gaussian::new(0.0, 1.0).unwrap());

    #[test]
    fn new_should_reject_bad_params() {
        assert!(Gaussian::new(f64::NAN, 1.0).is_err());
        assert_eq!(
            Gaussian::new(0.0, 0.0),
            Err(GaussianError::SigmaTooLow { sigma: 0.0 })
        );
        assert!(Gaussian::new(0.0, -1.0).is_err());
        assert!(Gaussian::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn draws_center_on_mu() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let gauss = Gaussian::new(-2.0, 0.5).unwrap();
        let xs: Vec<f64> = gauss.sample(2_000, &mut rng);
        let mean = xs.iter().sum::<f64>() / 2_000.0;
        assert!((mean + 2.0).abs() < 0.1);
    }

    #[test]
    fn draw_spread_tracks_sigma() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let gauss = Gaussian::new_unchecked(0.0, 3.0);
        let xs: Vec<f64> = gauss.sample(5_000, &mut rng);
        let var = xs.iter().map(|x| x * x).sum::<f64>() / 5_000.0;
        assert!((var.sqrt() - gauss.sigma()).abs() < 0.2);
    }
}
