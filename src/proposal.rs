//! Random-walk proposals and their step-size tuning
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::dist::{DiscreteUniform, Gaussian};
use crate::model::{Param, ParameterState};
use crate::traits::Sampleable;
use rand::Rng;

/// Step sizes are kept inside this range while tuning
const MIN_SCALE: f64 = 1E-10;
const MAX_SCALE: f64 = 1E10;

/// Standard deviations of the Gaussian random-walk steps on the rates
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct ProposalScale {
    pub lambda1: f64,
    pub lambda2: f64,
}

impl ProposalScale {
    pub fn new(lambda1: f64, lambda2: f64) -> Self {
        ProposalScale { lambda1, lambda2 }
    }

    /// The scale of `param`. `tau` has no continuous scale.
    pub fn get(&self, param: Param) -> Option<f64> {
        match param {
            Param::Lambda1 => Some(self.lambda1),
            Param::Lambda2 => Some(self.lambda2),
            Param::Tau => None,
        }
    }

    fn get_mut(&mut self, param: Param) -> Option<&mut f64> {
        match param {
            Param::Lambda1 => Some(&mut self.lambda1),
            Param::Lambda2 => Some(&mut self.lambda2),
            Param::Tau => None,
        }
    }
}

impl Default for ProposalScale {
    fn default() -> Self {
        ProposalScale::new(1.0, 1.0)
    }
}

/// How candidate changepoints are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum TauProposal {
    /// Uniform over every day. Can jump between separated modes.
    #[default]
    GlobalUniform,
    /// Move by a uniform nonzero offset in `[-radius, radius]`. Steps that
    /// leave `[0, N - 1]` are out of support.
    LocalWalk { radius: usize },
}

/// Target band for the per-window acceptance rate while tuning
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct AcceptanceBand {
    pub low: f64,
    pub high: f64,
}

impl AcceptanceBand {
    pub fn new(low: f64, high: f64) -> Self {
        AcceptanceBand { low, high }
    }

    #[inline]
    pub fn contains(&self, rate: f64) -> bool {
        (self.low..=self.high).contains(&rate)
    }

    /// The multiplier applied to a step size after a window with the given
    /// acceptance rate. Rates far outside the band move the scale faster.
    ///
    /// # Example
    ///
    /// ```
    /// use switchpoint::proposal::AcceptanceBand;
    ///
    /// let band = AcceptanceBand::default();
    /// assert_eq!(band.scale_factor(0.3), 1.0);
    /// assert!(band.scale_factor(0.9) > 1.0);
    /// assert!(band.scale_factor(0.01) < 1.0);
    /// ```
    pub fn scale_factor(&self, rate: f64) -> f64 {
        if rate < self.low {
            if rate < 0.25 * self.low {
                0.5
            } else {
                0.9
            }
        } else if rate > self.high {
            if rate > 0.5_f64.mul_add(1.0 - self.high, self.high) {
                2.0
            } else {
                1.1
            }
        } else {
            1.0
        }
    }
}

impl Default for AcceptanceBand {
    fn default() -> Self {
        AcceptanceBand::new(0.2, 0.5)
    }
}

/// The result of proposing a move for one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Proposal {
    /// A candidate inside the support
    Candidate(ParameterState),
    /// The move left the support (a non-positive rate or a local tau step
    /// past either end of the series). Treated as a rejection.
    OutOfSupport,
}

/// Generates candidate moves and owns the per-parameter step sizes.
///
/// Each chain owns its own `Proposer`; the scales are never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposer {
    scales: ProposalScale,
    tau_policy: TauProposal,
    band: AcceptanceBand,
    tau_range: DiscreteUniform<usize>,
    frozen: bool,
}

impl Proposer {
    /// Create a proposer for a series of `n_days` (`n_days >= 1`).
    pub fn new(
        scales: ProposalScale,
        tau_policy: TauProposal,
        band: AcceptanceBand,
        n_days: usize,
    ) -> Self {
        Proposer {
            scales,
            tau_policy,
            band,
            tau_range: DiscreteUniform::new_unchecked(0, n_days.max(1) - 1),
            frozen: false,
        }
    }

    pub fn scales(&self) -> ProposalScale {
        self.scales
    }

    pub fn tau_policy(&self) -> TauProposal {
        self.tau_policy
    }

    pub fn band(&self) -> AcceptanceBand {
        self.band
    }

    /// Stop all further tuning
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Propose a move of `param` away from `current`, leaving the other two
    /// parameters untouched. Every proposal is symmetric.
    ///
    /// # Example
    ///
    /// ```
    /// use rand::SeedableRng;
    /// use rand_xoshiro::Xoshiro256PlusPlus;
    /// use switchpoint::model::{Param, ParameterState};
    /// use switchpoint::proposal::*;
    ///
    /// let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
    /// let proposer = Proposer::new(
    ///     ProposalScale::default(),
    ///     TauProposal::GlobalUniform,
    ///     AcceptanceBand::default(),
    ///     50,
    /// );
    /// let current = ParameterState::new(10.0, 20.0, 25);
    ///
    /// match proposer.propose(&current, Param::Tau, &mut rng) {
    ///     Proposal::Candidate(state) => {
    ///         assert!(state.tau < 50);
    ///         assert_eq!(state.lambda1, 10.0);
    ///     }
    ///     Proposal::OutOfSupport => unreachable!(),
    /// }
    /// ```
    pub fn propose<R: Rng>(
        &self,
        current: &ParameterState,
        param: Param,
        rng: &mut R,
    ) -> Proposal {
        let mut candidate = *current;
        match param {
            Param::Lambda1 => {
                candidate.lambda1 = self.step_rate(current.lambda1, self.scales.lambda1, rng);
                if candidate.lambda1 <= 0.0 {
                    return Proposal::OutOfSupport;
                }
            }
            Param::Lambda2 => {
                candidate.lambda2 = self.step_rate(current.lambda2, self.scales.lambda2, rng);
                if candidate.lambda2 <= 0.0 {
                    return Proposal::OutOfSupport;
                }
            }
            Param::Tau => match self.step_tau(current.tau, rng) {
                Some(tau) => candidate.tau = tau,
                None => return Proposal::OutOfSupport,
            },
        }
        Proposal::Candidate(candidate)
    }

    fn step_rate<R: Rng>(&self, x: f64, scale: f64, rng: &mut R) -> f64 {
        let step: f64 = Gaussian::new_unchecked(0.0, scale).draw(rng);
        x + step
    }

    fn step_tau<R: Rng>(&self, tau: usize, rng: &mut R) -> Option<usize> {
        match self.tau_policy {
            TauProposal::GlobalUniform => Some(self.tau_range.draw(rng)),
            TauProposal::LocalWalk { radius } => {
                let offset = rng.gen_range(1..=radius.max(1));
                let candidate = if rng.gen::<bool>() {
                    tau.checked_add(offset)?
                } else {
                    tau.checked_sub(offset)?
                };
                if candidate <= self.tau_range.b() {
                    Some(candidate)
                } else {
                    None
                }
            }
        }
    }

    /// Adjust the step size of `param` from the acceptance rate observed over
    /// the last tuning window and return the updated scales.
    ///
    /// A frozen proposer, the `tau` parameter, and a non-finite rate leave
    /// the scales untouched.
    pub fn tune(&mut self, param: Param, acceptance_rate: f64) -> ProposalScale {
        if self.frozen || !acceptance_rate.is_finite() {
            return self.scales;
        }
        let factor = self.band.scale_factor(acceptance_rate);
        if let Some(scale) = self.scales.get_mut(param) {
            let updated = (*scale * factor).clamp(MIN_SCALE, MAX_SCALE);
            tracing::debug!(
                param = %param,
                acceptance_rate,
                from = *scale,
                to = updated,
                "tuned proposal scale"
            );
            *scale = updated;
        }
        self.scales
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_basic_impls;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    const TOL: f64 = 1E-12;

    fn proposer(tau_policy: TauProposal) -> Proposer {
        Proposer::new(
            ProposalScale::new(2.0, 3.0),
            tau_policy,
            AcceptanceBand::default(),
            10,
        )
    }

    test_basic_impls!(proposer(TauProposal::GlobalUniform));

    #[test]
    fn scale_factor_grades() {
        let band = AcceptanceBand::new(0.2, 0.5);
        assert::close(band.scale_factor(0.01), 0.5, TOL);
        assert::close(band.scale_factor(0.1), 0.9, TOL);
        assert::close(band.scale_factor(0.2), 1.0, TOL);
        assert::close(band.scale_factor(0.5), 1.0, TOL);
        assert::close(band.scale_factor(0.6), 1.1, TOL);
        assert::close(band.scale_factor(0.9), 2.0, TOL);
    }

    #[test]
    fn tune_raises_scale_when_acceptance_is_high() {
        let mut prop = proposer(TauProposal::GlobalUniform);
        let scales = prop.tune(Param::Lambda1, 0.9);
        assert::close(scales.lambda1, 4.0, TOL);
        assert::close(scales.lambda2, 3.0, TOL);
    }

    #[test]
    fn tune_lowers_scale_when_acceptance_is_low() {
        let mut prop = proposer(TauProposal::GlobalUniform);
        let scales = prop.tune(Param::Lambda2, 0.15);
        assert::close(scales.lambda2, 2.7, TOL);
        assert::close(scales.lambda1, 2.0, TOL);
    }

    #[test]
    fn tune_ignores_tau_nan_and_frozen() {
        let mut prop = proposer(TauProposal::GlobalUniform);
        let original = prop.scales();
        assert_eq!(prop.tune(Param::Tau, 0.99), original);
        assert_eq!(prop.tune(Param::Lambda1, f64::NAN), original);
        prop.freeze();
        assert!(prop.is_frozen());
        assert_eq!(prop.tune(Param::Lambda1, 0.99), original);
    }

    #[test]
    fn tune_keeps_scale_positive() {
        let mut prop = proposer(TauProposal::GlobalUniform);
        for _ in 0..10_000 {
            prop.tune(Param::Lambda1, 0.0);
        }
        assert::close(prop.scales().lambda1, MIN_SCALE, TOL);
    }

    #[test]
    fn rate_proposals_only_move_their_param() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let prop = proposer(TauProposal::GlobalUniform);
        let current = ParameterState::new(50.0, 60.0, 4);
        for _ in 0..100 {
            if let Proposal::Candidate(c) =
                prop.propose(&current, Param::Lambda2, &mut rng)
            {
                assert_eq!(c.lambda1, 50.0);
                assert_eq!(c.tau, 4);
                assert!(c.lambda2 > 0.0);
            }
        }
    }

    #[test]
    fn rate_proposals_near_zero_can_leave_support() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let prop = proposer(TauProposal::GlobalUniform);
        let current = ParameterState::new(1E-3, 1.0, 4);
        let n_out = (0..1_000)
            .filter(|_| {
                prop.propose(&current, Param::Lambda1, &mut rng)
                    == Proposal::OutOfSupport
            })
            .count();
        assert!(n_out > 400 && n_out < 600);
    }

    #[test]
    fn global_tau_proposals_cover_every_day() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let prop = proposer(TauProposal::GlobalUniform);
        let current = ParameterState::new(1.0, 1.0, 0);
        let mut seen = [false; 10];
        for _ in 0..1_000 {
            match prop.propose(&current, Param::Tau, &mut rng) {
                Proposal::Candidate(c) => seen[c.tau] = true,
                Proposal::OutOfSupport => panic!("global proposals stay in range"),
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn local_tau_walk_is_rejected_past_the_edges() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(8);
        let prop = proposer(TauProposal::LocalWalk { radius: 1 });
        let at_start = ParameterState::new(1.0, 1.0, 0);
        let mut n_out = 0;
        for _ in 0..200 {
            match prop.propose(&at_start, Param::Tau, &mut rng) {
                Proposal::Candidate(c) => assert_eq!(c.tau, 1),
                Proposal::OutOfSupport => n_out += 1,
            }
        }
        assert!(n_out > 50 && n_out < 150);
    }

    proptest! {
        #[test]
        fn local_tau_candidates_are_within_radius(
            tau in 0_usize..10,
            radius in 1_usize..5,
            seed in any::<u64>(),
        ) {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            let prop = proposer(TauProposal::LocalWalk { radius });
            let current = ParameterState::new(1.0, 1.0, tau);
            if let Proposal::Candidate(c) = prop.propose(&current, Param::Tau, &mut rng) {
                prop_assert!(c.tau < 10);
                prop_assert!(c.tau != tau);
                prop_assert!(c.tau.abs_diff(tau) <= radius);
            }
        }
    }
}
