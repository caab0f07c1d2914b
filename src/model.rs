//! The single-changepoint Poisson model
//!
//! ```text
//! alpha    = 1 / mean(counts)
//! λ1, λ2   ~ Exponential(alpha)
//! τ        ~ DiscreteUniform(0, N - 1)
//! count[d] ~ Poisson(λ1 if d < τ else λ2)
//! ```
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::data::ObservationSeries;
use crate::dist::{DiscreteUniform, Exponential, Poisson, PoissonError};
use crate::misc::{cumsum, ln_fact};
use crate::traits::*;
use rand::Rng;
use std::fmt;

/// A point in parameter space: two Poisson rates and a changepoint day.
///
/// Day `d` is generated by `lambda1` when `d < tau` and by `lambda2`
/// otherwise, so `tau == 0` puts every day in the second regime.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct ParameterState {
    /// Rate before the changepoint
    pub lambda1: f64,
    /// Rate from the changepoint on
    pub lambda2: f64,
    /// Index of the first day in the second regime
    pub tau: usize,
}

impl ParameterState {
    pub fn new(lambda1: f64, lambda2: f64, tau: usize) -> Self {
        ParameterState {
            lambda1,
            lambda2,
            tau,
        }
    }

    /// The rate generating the count on `day`
    ///
    /// # Example
    ///
    /// ```
    /// use switchpoint::model::ParameterState;
    ///
    /// let state = ParameterState::new(10.0, 25.0, 40);
    /// assert_eq!(state.rate_on(39), 10.0);
    /// assert_eq!(state.rate_on(40), 25.0);
    /// ```
    #[inline]
    pub fn rate_on(&self, day: usize) -> f64 {
        if day < self.tau {
            self.lambda1
        } else {
            self.lambda2
        }
    }

    /// Simulate `n_days` of counts from the model with these parameters.
    ///
    /// Fails if either rate is not a valid Poisson rate.
    ///
    /// # Example
    ///
    /// ```
    /// use rand::SeedableRng;
    /// use rand_xoshiro::Xoshiro256PlusPlus;
    /// use switchpoint::model::ParameterState;
    ///
    /// let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    /// let state = ParameterState::new(1.0, 50.0, 3);
    /// let series = state.simulate(6, &mut rng).unwrap();
    ///
    /// assert_eq!(series.len(), 6);
    /// assert!(series.counts()[..3].iter().all(|&x| x < 20));
    /// assert!(series.counts()[3..].iter().all(|&x| x > 20));
    /// ```
    pub fn simulate<R: Rng>(
        &self,
        n_days: usize,
        rng: &mut R,
    ) -> Result<ObservationSeries, PoissonError> {
        let before = Poisson::new(self.lambda1)?;
        let after = Poisson::new(self.lambda2)?;
        Ok((0..n_days)
            .map(|day| -> u32 {
                if day < self.tau {
                    before.draw(rng)
                } else {
                    after.draw(rng)
                }
            })
            .collect())
    }

    /// The value of `param` in this state as a float
    #[inline]
    pub fn get(&self, param: Param) -> f64 {
        match param {
            Param::Lambda1 => self.lambda1,
            Param::Lambda2 => self.lambda2,
            Param::Tau => self.tau as f64,
        }
    }
}

impl fmt::Display for ParameterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(λ1: {}, λ2: {}, τ: {})",
            self.lambda1, self.lambda2, self.tau
        )
    }
}

/// Names one of the three model parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum Param {
    Lambda1,
    Lambda2,
    Tau,
}

impl Param {
    pub const ALL: [Param; 3] = [Param::Lambda1, Param::Lambda2, Param::Tau];

    pub fn as_str(&self) -> &str {
        match self {
            Param::Lambda1 => "lambda_1",
            Param::Lambda2 => "lambda_2",
            Param::Tau => "tau",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidModelError {
    /// The observation series has no days
    EmptySeries,
    /// The observation series has fewer than two days
    TooFewDays { n_days: usize },
    /// Every count is zero, so the rate prior is undefined
    ZeroMean,
}

/// The changepoint model bound to an observation series.
///
/// The likelihood is evaluated from prefix sums of the counts, so each
/// evaluation of [`log_joint`](ChangepointModel::log_joint) is O(1) in the
/// number of days.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangepointModel {
    rate_prior: Exponential,
    tau_prior: DiscreteUniform<usize>,
    /// `prefix[t]` is the sum of counts on days `< t`; length `N + 1`
    prefix: Vec<f64>,
    /// Σ ln(count[d]!), constant in the parameters
    sum_ln_fact: f64,
}

impl ChangepointModel {
    /// Bind the model to `series`.
    ///
    /// # Example
    ///
    /// ```
    /// use switchpoint::data::ObservationSeries;
    /// use switchpoint::model::{ChangepointModel, InvalidModelError};
    ///
    /// let model = ChangepointModel::new(&ObservationSeries::new(vec![2, 6]));
    /// assert!((model.unwrap().alpha() - 0.25).abs() < 1E-12);
    ///
    /// let zeros = ObservationSeries::new(vec![0, 0, 0]);
    /// assert_eq!(ChangepointModel::new(&zeros), Err(InvalidModelError::ZeroMean));
    /// ```
    pub fn new(series: &ObservationSeries) -> Result<Self, InvalidModelError> {
        let n_days = series.len();
        if n_days == 0 {
            return Err(InvalidModelError::EmptySeries);
        } else if n_days < 2 {
            return Err(InvalidModelError::TooFewDays { n_days });
        }

        let mean = series.mean().ok_or(InvalidModelError::EmptySeries)?;
        let rate_prior = Exponential::new(mean.recip())
            .map_err(|_| InvalidModelError::ZeroMean)?;
        let tau_prior = DiscreteUniform::new_unchecked(0, n_days - 1);

        let counts: Vec<u64> = series.iter().map(|&x| u64::from(x)).collect();
        let prefix: Vec<f64> = std::iter::once(0.0)
            .chain(cumsum(&counts).into_iter().map(|s| s as f64))
            .collect();
        let sum_ln_fact = series.iter().map(|&x| ln_fact(x as usize)).sum();

        Ok(ChangepointModel {
            rate_prior,
            tau_prior,
            prefix,
            sum_ln_fact,
        })
    }

    /// The rate of the exponential prior on λ1 and λ2
    #[inline]
    pub fn alpha(&self) -> f64 {
        self.rate_prior.rate()
    }

    /// Number of days, N
    #[inline]
    pub fn n_days(&self) -> usize {
        self.prefix.len() - 1
    }

    /// The prior on each rate
    pub fn rate_prior(&self) -> &Exponential {
        &self.rate_prior
    }

    /// The prior on the changepoint
    pub fn tau_prior(&self) -> &DiscreteUniform<usize> {
        &self.tau_prior
    }

    /// Both rates at their prior mean, `1 / alpha`, and `tau` at the
    /// middle of the series.
    pub fn prior_mean_state(&self) -> ParameterState {
        let rate = self.rate_prior.mean();
        ParameterState::new(rate, rate, (self.n_days() - 1) / 2)
    }

    /// Log prior density of `state`. `-∞` outside the support.
    pub fn ln_prior(&self, state: &ParameterState) -> f64 {
        if !self.supports(state) {
            return f64::NEG_INFINITY;
        }
        self.rate_prior.ln_f(&state.lambda1)
            + self.rate_prior.ln_f(&state.lambda2)
            + self.tau_prior.ln_f(&state.tau)
    }

    /// Log likelihood of the bound series under `state`. `-∞` outside the
    /// support.
    pub fn ln_likelihood(&self, state: &ParameterState) -> f64 {
        if !self.supports(state) {
            return f64::NEG_INFINITY;
        }
        let n = self.n_days();
        let sum_before = self.prefix[state.tau];
        let sum_after = self.prefix[n] - sum_before;
        let n_before = state.tau as f64;
        let n_after = (n - state.tau) as f64;

        sum_before.mul_add(state.lambda1.ln(), -n_before * state.lambda1)
            + sum_after.mul_add(state.lambda2.ln(), -n_after * state.lambda2)
            - self.sum_ln_fact
    }

    /// Log prior plus log likelihood.
    ///
    /// States outside the support (a non-positive or non-finite rate, or
    /// `tau >= N`) map to `-∞` without evaluating the likelihood.
    #[inline]
    pub fn log_joint(&self, state: &ParameterState) -> f64 {
        if !self.supports(state) {
            return f64::NEG_INFINITY;
        }
        self.ln_prior(state) + self.ln_likelihood(state)
    }
}

/// Evaluate the log joint of `state` against `series` in one call.
///
/// Builds the model each time, so prefer [`ChangepointModel::log_joint`] in
/// loops.
pub fn log_joint(
    state: &ParameterState,
    series: &ObservationSeries,
) -> Result<f64, InvalidModelError> {
    ChangepointModel::new(series).map(|model| model.log_joint(state))
}

impl Support<ParameterState> for ChangepointModel {
    fn supports(&self, state: &ParameterState) -> bool {
        let valid_rate = |x: f64| x > 0.0 && x.is_finite();
        valid_rate(state.lambda1)
            && valid_rate(state.lambda2)
            && state.tau < self.n_days()
    }
}

impl HasDensity<ParameterState> for ChangepointModel {
    fn ln_f(&self, state: &ParameterState) -> f64 {
        self.log_joint(state)
    }
}

/// Draws from the prior
impl Sampleable<ParameterState> for ChangepointModel {
    fn draw<R: Rng>(&self, rng: &mut R) -> ParameterState {
        ParameterState {
            lambda1: self.rate_prior.draw(rng),
            lambda2: self.rate_prior.draw(rng),
            tau: self.tau_prior.draw(rng),
        }
    }
}

impl std::error::Error for InvalidModelError {}

impl fmt::Display for InvalidModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySeries => write!(f, "the observation series is empty"),
            Self::TooFewDays { n_days } => write!(
                f,
                "the observation series needs at least two days, got {}",
                n_days
            ),
            Self::ZeroMean => write!(
                f,
                "every count is zero; the rate prior is undefined"
            ),
        }
    }
}
