//! Posterior summaries computed from a completed trace
//!
//! Every quantity here is a Monte Carlo average over the retained states.
//! Aggregation never modifies the trace, so repeated calls give identical
//! results.
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::misc::{cumsum, sorted_quantile};
use crate::model::{Param, ParameterState};
use crate::trace::Trace;
use itertools::Itertools;
use std::fmt;

/// Thresholds on `|λ1 - λ2|` reported by [`Posterior::summary`] in the
/// text-message analysis
pub const DEFAULT_DIFFERENCE_THRESHOLDS: [f64; 4] = [1.0, 2.0, 5.0, 10.0];

/// How a parameter value is compared against a bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    #[inline]
    pub fn holds(&self, value: f64, bound: f64) -> bool {
        match self {
            Comparison::Lt => value < bound,
            Comparison::Le => value <= bound,
            Comparison::Gt => value > bound,
            Comparison::Ge => value >= bound,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}

/// A predicate on one parameter of a state, e.g. `tau < 45`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct Condition {
    pub param: Param,
    pub comparison: Comparison,
    pub bound: f64,
}

impl Condition {
    pub fn new(param: Param, comparison: Comparison, bound: f64) -> Self {
        Condition {
            param,
            comparison,
            bound,
        }
    }

    pub fn lt(param: Param, bound: f64) -> Self {
        Condition::new(param, Comparison::Lt, bound)
    }

    pub fn le(param: Param, bound: f64) -> Self {
        Condition::new(param, Comparison::Le, bound)
    }

    pub fn gt(param: Param, bound: f64) -> Self {
        Condition::new(param, Comparison::Gt, bound)
    }

    pub fn ge(param: Param, bound: f64) -> Self {
        Condition::new(param, Comparison::Ge, bound)
    }

    /// Does `state` satisfy the condition?
    #[inline]
    pub fn matches(&self, state: &ParameterState) -> bool {
        self.comparison.holds(state.get(self.param), self.bound)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.param, self.comparison, self.bound)
    }
}

/// No trace entry satisfied the condition of a conditional query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmptyConditionalSetError {
    pub condition: Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosteriorError {
    /// The trace holds no states to average over
    EmptyTrace,
}

/// The headline numbers of an analysis
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct PosteriorSummary {
    /// Number of trace entries averaged over
    pub n_samples: usize,
    /// `E[λ_d | data]` for every day `d`
    pub expected_rate_per_day: Vec<f64>,
    /// `(threshold, P(|λ1 - λ2| >= threshold))` in the order requested
    pub difference_probabilities: Vec<(f64, f64)>,
    pub lambda1_mean: f64,
    pub lambda2_mean: f64,
    pub tau_mean: f64,
    /// `E[(λ2 - λ1) / λ1]`
    pub expected_relative_increase: f64,
}

/// Read-only aggregation over a non-empty [`Trace`].
///
/// # Example
///
/// ```
/// use switchpoint::model::{Param, ParameterState};
/// use switchpoint::posterior::{Condition, Posterior};
/// use switchpoint::trace::Trace;
///
/// let trace = Trace::from_states(
///     vec![
///         ParameterState::new(2.0, 6.0, 1),
///         ParameterState::new(4.0, 8.0, 2),
///     ],
///     3,
/// )
/// .unwrap();
/// let posterior = Posterior::new(&trace).unwrap();
///
/// assert_eq!(posterior.expected_rate_per_day(), vec![3.0, 5.0, 7.0]);
/// assert_eq!(posterior.probability_difference_at_least(4.0), 1.0);
///
/// let early = Condition::lt(Param::Tau, 2.0);
/// assert_eq!(posterior.conditional_mean(Param::Lambda1, early), Ok(2.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posterior<'t> {
    trace: &'t Trace,
}

impl<'t> Posterior<'t> {
    pub fn new(trace: &'t Trace) -> Result<Self, PosteriorError> {
        if trace.is_empty() {
            Err(PosteriorError::EmptyTrace)
        } else {
            Ok(Posterior { trace })
        }
    }

    pub fn trace(&self) -> &Trace {
        self.trace
    }

    /// Number of states averaged over
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.trace.len()
    }

    /// Posterior mean of `param`
    pub fn mean(&self, param: Param) -> f64 {
        // The trace is non-empty so there is always a mean
        mean_of(self.trace.iter().map(|s| s.get(param))).unwrap_or(f64::NAN)
    }

    /// Monte Carlo estimate of `E[λ_d | data]` for each day `d`.
    ///
    /// Entry `d` averages `λ1` over the states with `d < τ` together with
    /// `λ2` over the rest.
    pub fn expected_rate_per_day(&self) -> Vec<f64> {
        let n_days = self.trace.n_days();
        let n = self.n_samples() as f64;

        // Per-changepoint sums of each rate
        let mut lambda1_by_tau = vec![0.0; n_days];
        let mut lambda2_by_tau = vec![0.0; n_days];
        self.trace.iter().for_each(|s| {
            lambda1_by_tau[s.tau] += s.lambda1;
            lambda2_by_tau[s.tau] += s.lambda2;
        });

        // Day d takes λ1 from states with τ > d and λ2 from states with
        // τ <= d
        let mut lambda1_after = vec![0.0; n_days];
        for d in (0..n_days.saturating_sub(1)).rev() {
            lambda1_after[d] = lambda1_after[d + 1] + lambda1_by_tau[d + 1];
        }
        cumsum(&lambda2_by_tau)
            .iter()
            .zip(lambda1_after.iter())
            .map(|(lambda2_upto, lambda1_after)| {
                (lambda1_after + lambda2_upto) / n
            })
            .collect()
    }

    /// Fraction of states with `|λ1 - λ2| >= threshold`
    pub fn probability_difference_at_least(&self, threshold: f64) -> f64 {
        let n_hits = self
            .trace
            .iter()
            .filter(|s| (s.lambda1 - s.lambda2).abs() >= threshold)
            .count();
        n_hits as f64 / self.n_samples() as f64
    }

    /// Mean of `param` over the states that satisfy `condition`.
    ///
    /// When every state matches, the result is exactly
    /// [`mean(param)`](Posterior::mean).
    pub fn conditional_mean(
        &self,
        param: Param,
        condition: Condition,
    ) -> Result<f64, EmptyConditionalSetError> {
        mean_of(
            self.trace
                .iter()
                .filter(|s| condition.matches(s))
                .map(|s| s.get(param)),
        )
        .ok_or(EmptyConditionalSetError { condition })
    }

    /// Posterior mean of the relative change `(λ2 - λ1) / λ1`
    pub fn expected_relative_increase(&self) -> f64 {
        mean_of(
            self.trace
                .iter()
                .map(|s| (s.lambda2 - s.lambda1) / s.lambda1),
        )
        .unwrap_or(f64::NAN)
    }

    /// Posterior probability of each changepoint day
    pub fn tau_distribution(&self) -> Vec<f64> {
        let n = self.n_samples() as f64;
        let counts = self.trace.iter().map(|s| s.tau).counts();
        (0..self.trace.n_days())
            .map(|day| counts.get(&day).copied().unwrap_or(0) as f64 / n)
            .collect()
    }

    /// The `p`-quantile of `param`'s marginal posterior. `None` when `p` is
    /// outside of [0, 1].
    pub fn quantile(&self, param: Param, p: f64) -> Option<f64> {
        let xs: Vec<f64> = self
            .trace
            .iter()
            .map(|s| s.get(param))
            .sorted_by(|a, b| a.total_cmp(b))
            .collect();
        sorted_quantile(&xs, p)
    }

    /// Compute the headline numbers, with a difference probability for each
    /// of `thresholds`
    pub fn summary(&self, thresholds: &[f64]) -> PosteriorSummary {
        PosteriorSummary {
            n_samples: self.n_samples(),
            expected_rate_per_day: self.expected_rate_per_day(),
            difference_probabilities: thresholds
                .iter()
                .map(|&t| (t, self.probability_difference_at_least(t)))
                .collect(),
            lambda1_mean: self.mean(Param::Lambda1),
            lambda2_mean: self.mean(Param::Lambda2),
            tau_mean: self.mean(Param::Tau),
            expected_relative_increase: self.expected_relative_increase(),
        }
    }
}

/// Sum in iteration order, then divide. `None` for no values.
fn mean_of<I: Iterator<Item = f64>>(xs: I) -> Option<f64> {
    let (n, sum) = xs.fold((0_usize, 0.0), |(n, sum), x| (n + 1, sum + x));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

impl std::error::Error for EmptyConditionalSetError {}
impl std::error::Error for PosteriorError {}

impl fmt::Display for EmptyConditionalSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no trace entries satisfy {}", self.condition)
    }
}

impl fmt::Display for PosteriorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTrace => write!(f, "the trace is empty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1E-12;

    fn trace() -> Trace {
        Trace::from_states(
            vec![
                ParameterState::new(1.0, 4.0, 1),
                ParameterState::new(2.0, 2.5, 2),
                ParameterState::new(3.0, 9.0, 0),
                ParameterState::new(2.0, 2.5, 2),
            ],
            4,
        )
        .unwrap()
    }

    fn naive_expected_rate(trace: &Trace) -> Vec<f64> {
        (0..trace.n_days())
            .map(|d| {
                trace.iter().map(|s| s.rate_on(d)).sum::<f64>()
                    / trace.len() as f64
            })
            .collect()
    }

    #[test]
    fn empty_trace_is_an_error() {
        let trace = Trace::from_states(vec![], 3).unwrap();
        assert_eq!(Posterior::new(&trace), Err(PosteriorError::EmptyTrace));
    }

    #[test]
    fn expected_rate_matches_day_by_day_average() {
        let trace = trace();
        let posterior = Posterior::new(&trace).unwrap();
        let fast = posterior.expected_rate_per_day();
        let naive = naive_expected_rate(&trace);
        assert_eq!(fast.len(), 4);
        fast.iter()
            .zip(naive.iter())
            .for_each(|(a, b)| assert::close(*a, *b, TOL));
    }

    #[test]
    fn expected_rate_with_tau_zero_is_lambda2() {
        let trace =
            Trace::from_states(vec![ParameterState::new(1.0, 7.0, 0)], 3)
                .unwrap();
        let posterior = Posterior::new(&trace).unwrap();
        assert_eq!(posterior.expected_rate_per_day(), vec![7.0, 7.0, 7.0]);
    }

    #[test]
    fn difference_probabilities() {
        let trace = trace();
        let posterior = Posterior::new(&trace).unwrap();
        assert_eq!(posterior.probability_difference_at_least(0.0), 1.0);
        assert::close(posterior.probability_difference_at_least(0.5), 1.0, TOL);
        assert::close(posterior.probability_difference_at_least(1.0), 0.5, TOL);
        assert::close(posterior.probability_difference_at_least(6.0), 0.25, TOL);
        assert_eq!(posterior.probability_difference_at_least(6.5), 0.0);
    }

    #[test]
    fn conditional_mean_over_subset() {
        let trace = trace();
        let posterior = Posterior::new(&trace).unwrap();
        let mean = posterior
            .conditional_mean(Param::Lambda1, Condition::ge(Param::Tau, 1.0))
            .unwrap();
        assert::close(mean, 5.0 / 3.0, TOL);

        let mean = posterior
            .conditional_mean(Param::Tau, Condition::gt(Param::Lambda2, 3.0))
            .unwrap();
        assert::close(mean, 0.5, TOL);
    }

    #[test]
    fn conditional_mean_matching_everything_is_the_mean() {
        let trace = trace();
        let posterior = Posterior::new(&trace).unwrap();
        for param in Param::ALL {
            let cond = Condition::le(Param::Tau, 3.0);
            assert_eq!(
                posterior.conditional_mean(param, cond),
                Ok(posterior.mean(param))
            );
        }
    }

    #[test]
    fn conditional_mean_matching_nothing_is_an_error() {
        let trace = trace();
        let posterior = Posterior::new(&trace).unwrap();
        let condition = Condition::lt(Param::Tau, 0.0);
        assert_eq!(
            posterior.conditional_mean(Param::Lambda1, condition),
            Err(EmptyConditionalSetError { condition })
        );
    }

    #[test]
    fn relative_increase() {
        let trace = trace();
        let posterior = Posterior::new(&trace).unwrap();
        // (3 + 0.25 + 2 + 0.25) / 4
        assert::close(posterior.expected_relative_increase(), 1.375, TOL);
    }

    #[test]
    fn tau_distribution_sums_to_one() {
        let trace = trace();
        let posterior = Posterior::new(&trace).unwrap();
        assert_eq!(posterior.tau_distribution(), vec![0.25, 0.25, 0.5, 0.0]);
    }

    #[test]
    fn quantiles() {
        let trace = trace();
        let posterior = Posterior::new(&trace).unwrap();
        assert_eq!(posterior.quantile(Param::Lambda1, 0.0), Some(1.0));
        assert_eq!(posterior.quantile(Param::Lambda1, 1.0), Some(3.0));
        assert_eq!(posterior.quantile(Param::Lambda1, 0.5), Some(2.0));
        assert_eq!(posterior.quantile(Param::Tau, 2.0), None);
    }

    #[test]
    fn summary_is_consistent_with_queries() {
        let trace = trace();
        let posterior = Posterior::new(&trace).unwrap();
        let summary = posterior.summary(&DEFAULT_DIFFERENCE_THRESHOLDS);
        assert_eq!(summary.n_samples, 4);
        assert_eq!(
            summary.expected_rate_per_day,
            posterior.expected_rate_per_day()
        );
        assert_eq!(summary.difference_probabilities.len(), 4);
        assert_eq!(summary.difference_probabilities[0].0, 1.0);
        assert_eq!(summary.tau_mean, posterior.mean(Param::Tau));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let trace = trace();
        let posterior = Posterior::new(&trace).unwrap();
        let a = posterior.summary(&[0.0, 1.0]);
        let b = posterior.summary(&[0.0, 1.0]);
        assert_eq!(a, b);
        assert_eq!(trace, self::trace());
    }
}
