//! The ordered record of a chain's retained states
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::model::{Param, ParameterState};
use std::fmt;
use std::ops::Index;

/// Retained states of one Markov chain, in chain order.
///
/// Entry `i` is the state after the decision of sampling iteration `i`,
/// so a rejected move repeats the previous state. A `Trace` cannot be
/// modified once built.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde1",
    serde(rename_all = "snake_case", try_from = "RawTrace")
)]
pub struct Trace {
    states: Vec<ParameterState>,
    n_days: usize,
}

/// Unvalidated wire form of a [`Trace`]. Deserialization goes through
/// [`Trace::from_states`].
#[cfg(feature = "serde1")]
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
struct RawTrace {
    states: Vec<ParameterState>,
    n_days: usize,
}

#[cfg(feature = "serde1")]
impl TryFrom<RawTrace> for Trace {
    type Error = TraceError;

    fn try_from(raw: RawTrace) -> Result<Self, Self::Error> {
        Trace::from_states(raw.states, raw.n_days)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraceError {
    /// A state has a non-positive or non-finite rate, or `tau >= n_days`
    InvalidState { index: usize, state: ParameterState },
}

impl Trace {
    /// Build a trace from states recorded against a series of `n_days`.
    ///
    /// # Example
    ///
    /// ```
    /// use switchpoint::model::ParameterState;
    /// use switchpoint::trace::Trace;
    ///
    /// let states = vec![
    ///     ParameterState::new(1.0, 2.0, 3),
    ///     ParameterState::new(1.5, 2.5, 4),
    /// ];
    /// let trace = Trace::from_states(states, 5).unwrap();
    /// assert_eq!(trace.taus(), vec![3, 4]);
    ///
    /// let bad = vec![ParameterState::new(1.0, 2.0, 5)];
    /// assert!(Trace::from_states(bad, 5).is_err());
    /// ```
    pub fn from_states(
        states: Vec<ParameterState>,
        n_days: usize,
    ) -> Result<Self, TraceError> {
        let valid_rate = |x: f64| x > 0.0 && x.is_finite();
        if let Some((index, state)) = states.iter().enumerate().find(|(_, s)| {
            !(valid_rate(s.lambda1) && valid_rate(s.lambda2) && s.tau < n_days)
        }) {
            return Err(TraceError::InvalidState {
                index,
                state: *state,
            });
        }
        Ok(Trace { states, n_days })
    }

    /// States produced by the sampler are in support by construction
    pub(crate) fn new_unchecked(
        states: Vec<ParameterState>,
        n_days: usize,
    ) -> Self {
        Trace { states, n_days }
    }

    /// Number of retained iterations
    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Length of the series the chain was run against
    #[inline]
    pub fn n_days(&self) -> usize {
        self.n_days
    }

    pub fn states(&self) -> &[ParameterState] {
        &self.states
    }

    pub fn get(&self, ix: usize) -> Option<&ParameterState> {
        self.states.get(ix)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParameterState> {
        self.states.iter()
    }

    pub fn last(&self) -> Option<&ParameterState> {
        self.states.last()
    }

    /// The values of `param` in chain order
    pub fn values(&self, param: Param) -> Vec<f64> {
        self.states.iter().map(|s| s.get(param)).collect()
    }

    pub fn lambda1s(&self) -> Vec<f64> {
        self.values(Param::Lambda1)
    }

    pub fn lambda2s(&self) -> Vec<f64> {
        self.values(Param::Lambda2)
    }

    pub fn taus(&self) -> Vec<usize> {
        self.states.iter().map(|s| s.tau).collect()
    }
}

impl Index<usize> for Trace {
    type Output = ParameterState;

    fn index(&self, ix: usize) -> &Self::Output {
        &self.states[ix]
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a ParameterState;
    type IntoIter = std::slice::Iter<'a, ParameterState>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::error::Error for TraceError {}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState { index, state } => {
                write!(f, "state {} at index {} is out of support", state, index)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_basic_impls;

    fn trace() -> Trace {
        Trace::from_states(
            vec![
                ParameterState::new(1.0, 2.0, 0),
                ParameterState::new(1.0, 2.0, 0),
                ParameterState::new(3.0, 4.0, 2),
            ],
            3,
        )
        .unwrap()
    }

    test_basic_impls!(trace());

    #[test]
    fn values_follow_chain_order() {
        let trace = trace();
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.lambda1s(), vec![1.0, 1.0, 3.0]);
        assert_eq!(trace.lambda2s(), vec![2.0, 2.0, 4.0]);
        assert_eq!(trace.values(Param::Tau), vec![0.0, 0.0, 2.0]);
        assert_eq!(trace[2].tau, 2);
        assert_eq!(trace.last(), trace.get(2));
    }

    #[test]
    fn from_states_reports_first_bad_index() {
        let states = vec![
            ParameterState::new(1.0, 2.0, 0),
            ParameterState::new(-1.0, 2.0, 0),
            ParameterState::new(1.0, 0.0, 0),
        ];
        match Trace::from_states(states, 3) {
            Err(TraceError::InvalidState { index, .. }) => assert_eq!(index, 1),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[cfg(feature = "serde1")]
    #[test]
    fn deserialize_round_trips_a_valid_trace() {
        let trace = trace();
        let json = serde_json::to_string(&trace).unwrap();
        let back: Trace = serde_json::from_str(&json).unwrap();
        assert_eq!(trace, back);
    }

    #[cfg(feature = "serde1")]
    #[test]
    fn deserialize_rejects_tau_past_the_series() {
        let json = r#"{"states":[{"lambda1":1.0,"lambda2":2.0,"tau":9}],"n_days":3}"#;
        let err = serde_json::from_str::<Trace>(json).unwrap_err();
        assert!(err.to_string().contains("out of support"));
    }

    #[cfg(feature = "serde1")]
    #[test]
    fn deserialize_rejects_non_positive_rate() {
        let json = r#"{"states":[{"lambda1":0.0,"lambda2":2.0,"tau":1}],"n_days":3}"#;
        assert!(serde_json::from_str::<Trace>(json).is_err());
    }

    #[test]
    fn empty_trace_is_allowed() {
        let trace = Trace::from_states(vec![], 10).unwrap();
        assert!(trace.is_empty());
        assert_eq!(trace.n_days(), 10);
    }
}
