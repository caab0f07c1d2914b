//! Metropolis-within-Gibbs sampler for the changepoint model
//!
//! One iteration is a sweep that proposes and then accepts or rejects a move
//! for each of `lambda1`, `lambda2`, and `tau` in turn. The chain moves
//! through the phases
//!
//! ```text
//! Init -> Tuning -> Sampling -> Done
//! ```
//!
//! Tuning iterations adapt the rate step sizes and are discarded. Sampling
//! iterations run with frozen step sizes and record the post-decision state
//! of every iteration.
mod config;

pub use config::*;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::data::ObservationSeries;
use crate::model::{ChangepointModel, InvalidModelError, Param, ParameterState};
use crate::proposal::{Proposal, ProposalScale, Proposer};
use crate::trace::Trace;
use crate::traits::Support;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::fmt;
use std::time::Instant;

/// The phase of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum Phase {
    Init,
    Tuning,
    Sampling,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Init => "init",
            Phase::Tuning => "tuning",
            Phase::Sampling => "sampling",
            Phase::Done => "done",
        };
        write!(f, "{}", s)
    }
}

/// What happened to one proposed move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveOutcome {
    Accepted,
    Rejected,
    /// The proposal left the support and was rejected without evaluating
    /// the model
    OutOfSupport,
}

impl MoveOutcome {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        *self == MoveOutcome::Accepted
    }
}

/// Per-parameter move counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct AcceptanceStats {
    proposed: [usize; 3],
    accepted: [usize; 3],
    out_of_support: [usize; 3],
}

#[inline]
fn param_ix(param: Param) -> usize {
    match param {
        Param::Lambda1 => 0,
        Param::Lambda2 => 1,
        Param::Tau => 2,
    }
}

impl AcceptanceStats {
    fn record(&mut self, param: Param, outcome: MoveOutcome) {
        let ix = param_ix(param);
        self.proposed[ix] += 1;
        match outcome {
            MoveOutcome::Accepted => self.accepted[ix] += 1,
            MoveOutcome::OutOfSupport => self.out_of_support[ix] += 1,
            MoveOutcome::Rejected => (),
        }
    }

    pub fn proposed(&self, param: Param) -> usize {
        self.proposed[param_ix(param)]
    }

    pub fn accepted(&self, param: Param) -> usize {
        self.accepted[param_ix(param)]
    }

    /// Rejections caused by a proposal leaving the support
    pub fn out_of_support(&self, param: Param) -> usize {
        self.out_of_support[param_ix(param)]
    }

    /// Fraction of proposals accepted. `None` before any proposal.
    pub fn rate(&self, param: Param) -> Option<f64> {
        let n = self.proposed(param);
        if n == 0 {
            None
        } else {
            Some(self.accepted(param) as f64 / n as f64)
        }
    }
}

/// How tuning went
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct TuningReport {
    /// Tuning iterations completed
    pub iterations: usize,
    /// Windows after which the step sizes were adjusted
    pub windows: usize,
    /// Acceptance counts over the last complete tuning window, or over all
    /// tuning iterations when no window completed
    pub final_window: AcceptanceStats,
    /// Step sizes at the end of tuning
    pub scales: ProposalScale,
}

/// The product of a finished chain
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct ChainOutcome {
    pub trace: Trace,
    /// `true` when the budget stopped the chain early
    pub truncated: bool,
    pub tuning: TuningReport,
    /// Move counts over the sampling phase
    pub acceptance: AcceptanceStats,
    /// Step sizes used while sampling
    pub scales: ProposalScale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SamplerError {
    /// The data cannot support the model
    InvalidModel(InvalidModelError),
    /// The configuration is unusable
    InvalidConfig(ConfigError),
    /// The log joint of the current state is not finite
    NumericalInstability {
        phase: Phase,
        iteration: usize,
        state: ParameterState,
        log_joint: f64,
    },
}

impl From<InvalidModelError> for SamplerError {
    fn from(err: InvalidModelError) -> Self {
        SamplerError::InvalidModel(err)
    }
}

impl From<ConfigError> for SamplerError {
    fn from(err: ConfigError) -> Self {
        SamplerError::InvalidConfig(err)
    }
}

/// A single Metropolis chain over a [`ChangepointModel`].
///
/// # Example
///
/// ```
/// use switchpoint::data::ObservationSeries;
/// use switchpoint::model::ChangepointModel;
/// use switchpoint::sampler::{MetropolisSampler, Phase, SamplerConfig};
///
/// let series = ObservationSeries::new(vec![2, 3, 1, 2, 9, 11, 8, 10]);
/// let model = ChangepointModel::new(&series).unwrap();
/// let config = SamplerConfig::new().with_n_tune(200).with_n_samples(300);
///
/// let mut sampler = MetropolisSampler::new(&model, config).unwrap();
/// assert_eq!(sampler.phase(), Phase::Init);
///
/// let outcome = sampler.run().unwrap();
/// assert_eq!(outcome.trace.len(), 300);
/// assert!(!outcome.truncated);
/// ```
#[derive(Debug, Clone)]
pub struct MetropolisSampler<'m> {
    model: &'m ChangepointModel,
    config: SamplerConfig,
    rng: Xoshiro256PlusPlus,
    proposer: Proposer,
    state: ParameterState,
    log_joint: f64,
    phase: Phase,
    /// Iterations completed in the current phase
    iteration: usize,
    /// Iterations completed over all phases
    total_iterations: usize,
    window: AcceptanceStats,
    tuning: TuningReport,
    sampling: AcceptanceStats,
    states: Vec<ParameterState>,
    started: Option<Instant>,
    truncated: bool,
}

impl<'m> MetropolisSampler<'m> {
    /// Set up a chain seeded from `config.seed`.
    ///
    /// Fails if the configuration is invalid, the initial state is out of
    /// support, or the initial log joint is not finite.
    pub fn new(
        model: &'m ChangepointModel,
        config: SamplerConfig,
    ) -> Result<Self, SamplerError> {
        let rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);
        Self::with_rng(model, config, rng)
    }

    /// Set up a chain that draws from `rng` instead of seeding from
    /// `config.seed`.
    pub fn with_rng(
        model: &'m ChangepointModel,
        config: SamplerConfig,
        rng: Xoshiro256PlusPlus,
    ) -> Result<Self, SamplerError> {
        config.validate()?;

        let state = match config.initial_state {
            Some(state) if !model.supports(&state) => {
                return Err(ConfigError::InvalidInitialState { state }.into())
            }
            Some(state) => state,
            None => model.prior_mean_state(),
        };

        let log_joint = model.log_joint(&state);
        if !log_joint.is_finite() {
            tracing::error!(%state, log_joint, "initial log joint is not finite");
            return Err(SamplerError::NumericalInstability {
                phase: Phase::Init,
                iteration: 0,
                state,
                log_joint,
            });
        }

        let proposer = Proposer::new(
            config.initial_scales,
            config.tau_proposal,
            config.band,
            model.n_days(),
        );

        Ok(MetropolisSampler {
            model,
            rng,
            tuning: TuningReport {
                iterations: 0,
                windows: 0,
                final_window: AcceptanceStats::default(),
                scales: proposer.scales(),
            },
            proposer,
            state,
            log_joint,
            phase: Phase::Init,
            iteration: 0,
            total_iterations: 0,
            window: AcceptanceStats::default(),
            sampling: AcceptanceStats::default(),
            states: Vec::with_capacity(config.n_samples),
            started: None,
            truncated: false,
            config,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The current state of the chain
    pub fn state(&self) -> &ParameterState {
        &self.state
    }

    /// The log joint of the current state
    pub fn log_joint(&self) -> f64 {
        self.log_joint
    }

    /// The current step sizes
    pub fn scales(&self) -> ProposalScale {
        self.proposer.scales()
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Advance the chain by one unit of work: a phase transition or one
    /// sweep. Returns the phase after the step. Stepping a finished chain
    /// does nothing.
    pub fn step(&mut self) -> Result<Phase, SamplerError> {
        match self.phase {
            Phase::Init => {
                self.started = Some(Instant::now());
                self.enter(Phase::Tuning);
            }
            Phase::Tuning => {
                if self.iteration >= self.config.n_tune {
                    self.finish_tuning();
                    self.enter(Phase::Sampling);
                } else if self.budget_exhausted() {
                    self.finish_tuning();
                    self.truncate();
                } else {
                    let outcomes = self.sweep()?;
                    outcomes.iter().for_each(|(param, outcome)| {
                        self.window.record(*param, *outcome)
                    });
                    self.advance();
                    if self.iteration % self.config.tune_interval == 0 {
                        self.tune_window();
                    }
                }
            }
            Phase::Sampling => {
                if self.iteration >= self.config.n_samples {
                    self.enter(Phase::Done);
                } else if self.budget_exhausted() {
                    self.truncate();
                } else {
                    let outcomes = self.sweep()?;
                    outcomes.iter().for_each(|(param, outcome)| {
                        self.sampling.record(*param, *outcome)
                    });
                    self.states.push(self.state);
                    self.advance();
                }
            }
            Phase::Done => (),
        }
        Ok(self.phase)
    }

    /// Drive the chain to `Done` and hand back its outcome
    pub fn run(mut self) -> Result<ChainOutcome, SamplerError> {
        while self.step()? != Phase::Done {}
        Ok(self.into_outcome())
    }

    fn into_outcome(self) -> ChainOutcome {
        ChainOutcome {
            trace: Trace::new_unchecked(self.states, self.model.n_days()),
            truncated: self.truncated,
            tuning: self.tuning,
            acceptance: self.sampling,
            scales: self.proposer.scales(),
        }
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!(from = %self.phase, to = %phase, "chain phase change");
        if phase == Phase::Sampling {
            self.proposer.freeze();
        }
        if phase == Phase::Done {
            tracing::info!(
                n_samples = self.states.len(),
                truncated = self.truncated,
                lambda1_acceptance = self.sampling.rate(Param::Lambda1),
                lambda2_acceptance = self.sampling.rate(Param::Lambda2),
                tau_acceptance = self.sampling.rate(Param::Tau),
                "chain finished"
            );
        }
        self.phase = phase;
        self.iteration = 0;
    }

    fn truncate(&mut self) {
        tracing::warn!(
            phase = %self.phase,
            iteration = self.iteration,
            total_iterations = self.total_iterations,
            "chain budget exhausted"
        );
        self.truncated = true;
        self.enter(Phase::Done);
    }

    fn advance(&mut self) {
        self.iteration += 1;
        self.total_iterations += 1;
    }

    fn budget_exhausted(&self) -> bool {
        let elapsed = self.started.map(|t| t.elapsed()).unwrap_or_default();
        self.config
            .budget
            .is_exhausted(self.total_iterations, elapsed)
    }

    fn tune_window(&mut self) {
        for param in [Param::Lambda1, Param::Lambda2] {
            if let Some(rate) = self.window.rate(param) {
                self.proposer.tune(param, rate);
            }
        }
        self.tuning.windows += 1;
        self.tuning.final_window = self.window;
        self.window = AcceptanceStats::default();
    }

    fn finish_tuning(&mut self) {
        self.tuning.iterations = self.iteration;
        if self.tuning.windows == 0 {
            self.tuning.final_window = self.window;
        }
        self.tuning.scales = self.proposer.scales();
    }

    /// One Metropolis update per parameter
    fn sweep(&mut self) -> Result<[(Param, MoveOutcome); 3], SamplerError> {
        let mut outcomes = [(Param::Lambda1, MoveOutcome::Rejected); 3];
        for (slot, param) in outcomes.iter_mut().zip(Param::ALL) {
            *slot = (param, self.update(param)?);
        }
        Ok(outcomes)
    }

    fn update(&mut self, param: Param) -> Result<MoveOutcome, SamplerError> {
        let outcome =
            match self.proposer.propose(&self.state, param, &mut self.rng) {
                Proposal::OutOfSupport => MoveOutcome::OutOfSupport,
                Proposal::Candidate(candidate) => {
                    let candidate_log_joint = self.model.log_joint(&candidate);
                    let delta = candidate_log_joint - self.log_joint;
                    if accept(delta, &mut self.rng) {
                        self.state = candidate;
                        self.log_joint = candidate_log_joint;
                        MoveOutcome::Accepted
                    } else {
                        MoveOutcome::Rejected
                    }
                }
            };

        if self.log_joint.is_finite() {
            Ok(outcome)
        } else {
            tracing::error!(
                phase = %self.phase,
                iteration = self.iteration,
                state = %self.state,
                log_joint = self.log_joint,
                "log joint of the current state is not finite"
            );
            Err(SamplerError::NumericalInstability {
                phase: self.phase,
                iteration: self.iteration,
                state: self.state,
                log_joint: self.log_joint,
            })
        }
    }
}

/// Metropolis acceptance in log space: accept iff `ln(u) < Δ` for
/// `u ~ U(0, 1)`. A uniform is drawn for every decision so the random
/// stream does not depend on the value of `Δ`. A NaN `Δ` always rejects.
#[inline]
fn accept<R: Rng>(delta: f64, rng: &mut R) -> bool {
    let u: f64 = rng.gen();
    u.ln() < delta
}

/// Build the model for `series` and run one chain to completion.
///
/// # Example
///
/// ```
/// use switchpoint::data::ObservationSeries;
/// use switchpoint::sampler::{sample, SamplerConfig, SamplerError};
/// use switchpoint::model::InvalidModelError;
///
/// let empty = ObservationSeries::default();
/// assert_eq!(
///     sample(&empty, &SamplerConfig::default()).unwrap_err(),
///     SamplerError::InvalidModel(InvalidModelError::EmptySeries),
/// );
/// ```
pub fn sample(
    series: &ObservationSeries,
    config: &SamplerConfig,
) -> Result<ChainOutcome, SamplerError> {
    let model = ChangepointModel::new(series)?;
    MetropolisSampler::new(&model, config.clone())?.run()
}

impl std::error::Error for SamplerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidModel(err) => Some(err),
            Self::InvalidConfig(err) => Some(err),
            Self::NumericalInstability { .. } => None,
        }
    }
}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidModel(err) => write!(f, "invalid model: {}", err),
            Self::InvalidConfig(err) => {
                write!(f, "invalid configuration: {}", err)
            }
            Self::NumericalInstability {
                phase,
                iteration,
                state,
                log_joint,
            } => write!(
                f,
                "log joint of state {} is {} at {} iteration {}",
                state, log_joint, phase, iteration
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::TauProposal;

    fn series() -> ObservationSeries {
        ObservationSeries::new(vec![
            4, 5, 4, 1, 3, 4, 3, 4, 2, 6, 3, 3, 4, 1, 2, 6, 1, 0, 1, 0, 1, 1,
            0, 0, 2, 1, 0, 1, 0, 0,
        ])
    }

    fn config() -> SamplerConfig {
        SamplerConfig::new()
            .with_n_tune(500)
            .with_n_samples(1_000)
            .with_seed(0x5EED)
    }

    #[test]
    fn phases_advance_in_order() {
        let model = ChangepointModel::new(&series()).unwrap();
        let config = SamplerConfig::new()
            .with_n_tune(2)
            .with_n_samples(2)
            .with_tune_interval(1);
        let mut sampler = MetropolisSampler::new(&model, config).unwrap();

        let phases: Vec<Phase> =
            (0..8).map(|_| sampler.step().unwrap()).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Tuning,
                Phase::Tuning,
                Phase::Tuning,
                Phase::Sampling,
                Phase::Sampling,
                Phase::Sampling,
                Phase::Done,
                Phase::Done,
            ]
        );
    }

    #[test]
    fn trace_has_n_samples_valid_entries() {
        let series = series();
        let outcome = sample(&series, &config()).unwrap();
        assert_eq!(outcome.trace.len(), 1_000);
        assert_eq!(outcome.trace.n_days(), series.len());
        assert!(outcome.trace.iter().all(|s| {
            s.lambda1 > 0.0 && s.lambda2 > 0.0 && s.tau < series.len()
        }));
        assert_eq!(outcome.tuning.iterations, 500);
        assert_eq!(outcome.tuning.windows, 5);
    }

    #[test]
    fn every_sampling_iteration_proposes_each_param_once() {
        let outcome = sample(&series(), &config()).unwrap();
        for param in Param::ALL {
            assert_eq!(outcome.acceptance.proposed(param), 1_000);
            let rate = outcome.acceptance.rate(param).unwrap();
            assert!((0.0..=1.0).contains(&rate));
        }
    }

    #[test]
    fn rejections_repeat_the_previous_state() {
        let outcome = sample(&series(), &config()).unwrap();
        let states = outcome.trace.states();
        let n_repeats = states.windows(2).filter(|w| w[0] == w[1]).count();
        // A repeat needs all three moves of a sweep to be rejected
        assert!(n_repeats > 0);
        assert!(n_repeats < states.len());
    }

    #[test]
    fn same_seed_same_trace() {
        let a = sample(&series(), &config()).unwrap();
        let b = sample(&series(), &config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_different_trace() {
        let a = sample(&series(), &config()).unwrap();
        let b = sample(&series(), &config().with_seed(1)).unwrap();
        assert_ne!(a.trace, b.trace);
    }

    #[test]
    fn zero_samples_gives_empty_trace() {
        let outcome = sample(&series(), &config().with_n_samples(0)).unwrap();
        assert!(outcome.trace.is_empty());
        assert!(!outcome.truncated);
        assert_eq!(outcome.acceptance.rate(Param::Tau), None);
    }

    #[test]
    fn zero_tune_keeps_initial_scales() {
        let outcome = sample(&series(), &config().with_n_tune(0)).unwrap();
        assert_eq!(outcome.tuning.iterations, 0);
        assert_eq!(outcome.tuning.windows, 0);
        assert_eq!(outcome.tuning.scales, ProposalScale::default());
    }

    #[test]
    fn scales_are_frozen_while_sampling() {
        let model = ChangepointModel::new(&series()).unwrap();
        let mut sampler = MetropolisSampler::new(&model, config()).unwrap();
        while sampler.step().unwrap() != Phase::Sampling {}
        let frozen = sampler.scales();
        while sampler.step().unwrap() != Phase::Done {
            assert_eq!(sampler.scales(), frozen);
        }
    }

    #[test]
    fn iteration_budget_truncates_during_sampling() {
        let config = config().with_budget(Budget::iterations(700));
        let outcome = sample(&series(), &config).unwrap();
        assert!(outcome.truncated);
        assert_eq!(outcome.tuning.iterations, 500);
        assert_eq!(outcome.trace.len(), 200);
    }

    #[test]
    fn iteration_budget_truncates_during_tuning() {
        let config = config().with_budget(Budget::iterations(120));
        let outcome = sample(&series(), &config).unwrap();
        assert!(outcome.truncated);
        assert_eq!(outcome.tuning.iterations, 120);
        assert_eq!(outcome.tuning.windows, 1);
        assert!(outcome.trace.is_empty());
    }

    #[test]
    fn zero_duration_budget_truncates_immediately() {
        let config =
            config().with_budget(Budget::duration(std::time::Duration::ZERO));
        let outcome = sample(&series(), &config).unwrap();
        assert!(outcome.truncated);
        assert!(outcome.trace.is_empty());
    }

    #[test]
    fn initial_state_out_of_support_is_a_config_error() {
        let model = ChangepointModel::new(&series()).unwrap();
        let state = ParameterState::new(1.0, 1.0, 30);
        let config = config().with_initial_state(state);
        assert_eq!(
            MetropolisSampler::new(&model, config).unwrap_err(),
            SamplerError::InvalidConfig(ConfigError::InvalidInitialState {
                state
            })
        );
    }

    #[test]
    fn custom_initial_state_is_used() {
        let model = ChangepointModel::new(&series()).unwrap();
        let state = ParameterState::new(3.5, 0.5, 17);
        let sampler =
            MetropolisSampler::new(&model, config().with_initial_state(state))
                .unwrap();
        assert_eq!(sampler.state(), &state);
        assert_eq!(sampler.log_joint(), model.log_joint(&state));
    }

    #[test]
    fn invalid_config_is_reported_before_sampling() {
        let config = config().with_tune_interval(0);
        assert_eq!(
            sample(&series(), &config).unwrap_err(),
            SamplerError::InvalidConfig(ConfigError::ZeroTuneInterval)
        );
    }

    #[test]
    fn local_walk_policy_produces_valid_trace() {
        let config =
            config().with_tau_proposal(TauProposal::LocalWalk { radius: 2 });
        let outcome = sample(&series(), &config).unwrap();
        assert_eq!(outcome.trace.len(), 1_000);
        assert!(outcome.trace.taus().iter().all(|&t| t < 30));
        assert_eq!(outcome.acceptance.proposed(Param::Tau), 1_000);
    }

    #[test]
    fn accept_in_log_space() {
        use rand::SeedableRng;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        assert!((0..100).all(|_| accept(0.0, &mut rng)));
        assert!((0..100).all(|_| accept(f64::INFINITY, &mut rng)));
        assert!((0..100).all(|_| !accept(f64::NEG_INFINITY, &mut rng)));
        assert!((0..100).all(|_| !accept(f64::NAN, &mut rng)));
        assert!((0..100).all(|_| !accept(-1E300, &mut rng)));
    }
}
