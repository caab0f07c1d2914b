//! Poisson distribution on unsigned integers
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::impl_display;
use crate::misc::ln_fact;
use crate::traits::*;
use rand::Rng;
use rand_distr::Poisson as RPoisson;
use std::fmt;

/// [Poisson distribution](https://en.wikipedia.org/wiki/Poisson_distribution)
/// of daily counts.
///
/// # Example
///
/// ```
/// use switchpoint::prelude::*;
///
/// let pois = Poisson::new(10.0).unwrap();
/// assert!((pois.pmf(&10_u32) - 0.125_110_035_721_133_9).abs() < 1E-12);
///
/// let mut rng = rand::thread_rng();
/// let counts: Vec<u32> = pois.sample(74, &mut rng);
/// assert_eq!(counts.len(), 74)
/// ```
#[derive(Debug, Clone, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct Poisson {
    rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum PoissonError {
    /// The rate is zero or negative
    RateTooLow { rate: f64 },
    /// The rate is infinite or NaN
    RateNotFinite { rate: f64 },
}

impl Poisson {
    pub fn new(rate: f64) -> Result<Self, PoissonError> {
        if rate <= 0.0 {
            Err(PoissonError::RateTooLow { rate })
        } else if !rate.is_finite() {
            Err(PoissonError::RateNotFinite { rate })
        } else {
            Ok(Poisson { rate })
        }
    }

    /// No validation of `rate`
    #[inline]
    pub fn new_unchecked(rate: f64) -> Self {
        Poisson { rate }
    }

    /// Expected count per day
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    fn sampler(&self) -> RPoisson<f64> {
        // A constructed Poisson always has a positive, finite rate
        RPoisson::new(self.rate).unwrap()
    }
}

impl From<&Poisson> for String {
    fn from(pois: &Poisson) -> String {
        format!("Poisson(λ: {})", pois.rate)
    }
}

impl_display!(Poisson);

impl HasDensity<u32> for Poisson {
    fn ln_f(&self, x: &u32) -> f64 {
        f64::from(*x).mul_add(self.rate.ln(), -self.rate) - ln_fact(*x as usize)
    }
}

impl Sampleable<u32> for Poisson {
    fn draw<R: Rng>(&self, rng: &mut R) -> u32 {
        rng.sample(self.sampler()) as u32
    }

    fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<u32> {
        rng.sample_iter(self.sampler())
            .take(n)
            .map(|x: f64| x as u32)
            .collect()
    }
}

impl Support<u32> for Poisson {
    fn supports(&self, _x: &u32) -> bool {
        true
    }
}

impl DiscreteDistr<u32> for Poisson {}

impl std::error::Error for PoissonError {}

impl fmt::Display for PoissonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateTooLow { rate } => {
                write!(f, "rate ({}) must be greater than zero", rate)
            }
            Self::RateNotFinite { rate } => {
                write!(f, "non-finite rate: {}", rate)
            }
        }
    }
}
