//! Discrete uniform distribution, U(a, b) on the integers in [a, b]
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::traits::*;
use num::{Integer, ToPrimitive};
use rand::Rng;
use rand_distr::uniform::SampleUniform;
use std::fmt;

pub trait DuParam: Integer + Copy {}
impl<T> DuParam for T where T: Integer + Copy {}

/// [Discrete uniform distribution](https://en.wikipedia.org/wiki/Discrete_uniform_distribution),
/// U(a, b) on the integers in [a, b] (both bounds inclusive).
///
/// The changepoint prior is `DiscreteUniform::new(0, n_days - 1)`. The
/// global tau proposal draws from the same distribution.
///
/// # Example
///
/// ```
/// use switchpoint::prelude::*;
///
/// let du = DiscreteUniform::new(0_usize, 3_usize).unwrap();
/// assert!((du.pmf(&2_usize) - 0.25).abs() < 1E-12);
/// assert_eq!(du.pmf(&4_usize), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct DiscreteUniform<T: DuParam> {
    a: T,
    b: T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum DiscreteUniformError {
    /// a is greater than b
    InvalidInterval,
}

impl<T: DuParam> DiscreteUniform<T> {
    /// Create a new discrete uniform distribution
    ///
    /// # Arguments
    /// - a: lower bound
    /// - b : upper bound
    #[inline]
    pub fn new(a: T, b: T) -> Result<Self, DiscreteUniformError> {
        if a <= b {
            Ok(Self { a, b })
        } else {
            Err(DiscreteUniformError::InvalidInterval)
        }
    }

    /// Creates a new DiscreteUniform without checking whether the parameters
    /// are valid.
    #[inline]
    pub fn new_unchecked(a: T, b: T) -> Self {
        Self { a, b }
    }

    /// Get lower bound parameter, a
    #[inline]
    pub fn a(&self) -> T {
        self.a
    }

    /// Get upper bound parameter, b
    #[inline]
    pub fn b(&self) -> T {
        self.b
    }
}

impl<T: DuParam + ToPrimitive> DiscreteUniform<T> {
    /// The number of values in the support, as a float
    #[inline]
    fn n_values(&self) -> f64 {
        let a = self.a.to_f64().unwrap_or(f64::NAN);
        let b = self.b.to_f64().unwrap_or(f64::NAN);
        b - a + 1.0
    }
}

impl<T> From<&DiscreteUniform<T>> for String
where
    T: DuParam + fmt::Display,
{
    fn from(u: &DiscreteUniform<T>) -> String {
        format!("DiscreteUniform({}, {})", u.a, u.b)
    }
}

impl<T> fmt::Display for DiscreteUniform<T>
where
    T: DuParam + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from(self))
    }
}

impl<X, T> HasDensity<X> for DiscreteUniform<T>
where
    X: Integer + From<T>,
    T: DuParam + ToPrimitive,
{
    fn ln_f(&self, x: &X) -> f64 {
        if *x >= X::from(self.a) && *x <= X::from(self.b) {
            -self.n_values().ln()
        } else {
            f64::NEG_INFINITY
        }
    }
}

impl<X, T> Sampleable<X> for DiscreteUniform<T>
where
    T: DuParam + SampleUniform,
    X: Integer + From<T>,
{
    fn draw<R: Rng>(&self, rng: &mut R) -> X {
        let d = rand::distributions::Uniform::new_inclusive(self.a, self.b);
        X::from(rng.sample(d))
    }

    fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<X> {
        let d = rand::distributions::Uniform::new_inclusive(self.a, self.b);
        rng.sample_iter(&d).take(n).map(X::from).collect()
    }
}

impl<X, T> Support<X> for DiscreteUniform<T>
where
    X: Integer + From<T>,
    T: DuParam,
{
    fn supports(&self, x: &X) -> bool {
        X::from(self.a) <= *x && X::from(self.b) >= *x
    }
}

impl<X, T> DiscreteDistr<X> for DiscreteUniform<T>
where
    X: Integer + From<T>,
    T: DuParam + ToPrimitive,
{
}

impl std::error::Error for DiscreteUniformError {}

impl fmt::Display for DiscreteUniformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInterval => {
                write!(f, "a (lower) is greater than b (upper)")
            }
        }
    }
}
