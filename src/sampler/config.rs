#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::model::{Param, ParameterState};
use crate::proposal::{AcceptanceBand, ProposalScale, TauProposal};
use std::fmt;
use std::time::Duration;

/// Default number of tuning (burn-in) iterations
pub const DEFAULT_N_TUNE: usize = 5_000;
/// Default number of retained iterations
pub const DEFAULT_N_SAMPLES: usize = 10_000;
/// Default number of iterations between step-size adjustments
pub const DEFAULT_TUNE_INTERVAL: usize = 100;

/// Limits on how long a chain may run. Checked only between iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct Budget {
    /// Maximum number of tuning plus sampling iterations
    pub max_iterations: Option<usize>,
    /// Maximum wall-clock time from the start of tuning
    pub max_duration: Option<Duration>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Budget::default()
    }

    pub fn iterations(max_iterations: usize) -> Self {
        Budget {
            max_iterations: Some(max_iterations),
            max_duration: None,
        }
    }

    pub fn duration(max_duration: Duration) -> Self {
        Budget {
            max_iterations: None,
            max_duration: Some(max_duration),
        }
    }

    /// `true` once either limit has been reached
    pub fn is_exhausted(&self, iterations: usize, elapsed: Duration) -> bool {
        self.max_iterations.map_or(false, |max| iterations >= max)
            || self.max_duration.map_or(false, |max| elapsed >= max)
    }
}

/// Everything a chain needs besides the data.
///
/// Nothing is read from the environment; every knob is set here.
///
/// # Example
///
/// ```
/// use switchpoint::proposal::TauProposal;
/// use switchpoint::sampler::SamplerConfig;
///
/// let config = SamplerConfig::new()
///     .with_n_tune(2_000)
///     .with_n_samples(4_000)
///     .with_seed(1337)
///     .with_tau_proposal(TauProposal::LocalWalk { radius: 3 });
///
/// assert!(config.validate().is_ok());
/// assert!(config.with_tune_interval(0).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case", default))]
pub struct SamplerConfig {
    /// Number of tuning iterations, discarded from the trace
    pub n_tune: usize,
    /// Number of retained iterations
    pub n_samples: usize,
    /// Seed of the chain's random number generator
    pub seed: u64,
    /// Iterations per tuning window
    pub tune_interval: usize,
    /// Target acceptance band for the rate proposals
    pub band: AcceptanceBand,
    pub tau_proposal: TauProposal,
    pub initial_scales: ProposalScale,
    /// Starting state. Defaults to the prior mean state.
    pub initial_state: Option<ParameterState>,
    pub budget: Budget,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            n_tune: DEFAULT_N_TUNE,
            n_samples: DEFAULT_N_SAMPLES,
            seed: 0,
            tune_interval: DEFAULT_TUNE_INTERVAL,
            band: AcceptanceBand::default(),
            tau_proposal: TauProposal::default(),
            initial_scales: ProposalScale::default(),
            initial_state: None,
            budget: Budget::default(),
        }
    }
}

impl SamplerConfig {
    pub fn new() -> Self {
        SamplerConfig::default()
    }

    #[must_use]
    pub fn with_n_tune(mut self, n_tune: usize) -> Self {
        self.n_tune = n_tune;
        self
    }

    #[must_use]
    pub fn with_n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_tune_interval(mut self, tune_interval: usize) -> Self {
        self.tune_interval = tune_interval;
        self
    }

    #[must_use]
    pub fn with_band(mut self, band: AcceptanceBand) -> Self {
        self.band = band;
        self
    }

    #[must_use]
    pub fn with_tau_proposal(mut self, tau_proposal: TauProposal) -> Self {
        self.tau_proposal = tau_proposal;
        self
    }

    #[must_use]
    pub fn with_initial_scales(mut self, scales: ProposalScale) -> Self {
        self.initial_scales = scales;
        self
    }

    #[must_use]
    pub fn with_initial_state(mut self, state: ParameterState) -> Self {
        self.initial_state = Some(state);
        self
    }

    #[must_use]
    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    /// Check the settings that do not depend on the data
    pub fn validate(&self) -> Result<(), ConfigError> {
        let AcceptanceBand { low, high } = self.band;
        if !(low.is_finite() && high.is_finite())
            || low < 0.0
            || high > 1.0
        {
            return Err(ConfigError::BandOutOfRange { low, high });
        }
        if low >= high {
            return Err(ConfigError::EmptyBand { low, high });
        }
        if self.tune_interval == 0 {
            return Err(ConfigError::ZeroTuneInterval);
        }
        for param in [Param::Lambda1, Param::Lambda2] {
            if let Some(scale) = self.initial_scales.get(param) {
                if !(scale > 0.0 && scale.is_finite()) {
                    return Err(ConfigError::InvalidScale { param, scale });
                }
            }
        }
        if self.tau_proposal == (TauProposal::LocalWalk { radius: 0 }) {
            return Err(ConfigError::ZeroRadius);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A band bound is non-finite or outside of [0, 1]
    BandOutOfRange { low: f64, high: f64 },
    /// The band's low bound is not below its high bound
    EmptyBand { low: f64, high: f64 },
    /// Tuning windows must contain at least one iteration
    ZeroTuneInterval,
    /// An initial step size is non-positive or non-finite
    InvalidScale { param: Param, scale: f64 },
    /// A local tau walk must be able to move
    ZeroRadius,
    /// The initial state is outside the model's support
    InvalidInitialState { state: ParameterState },
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BandOutOfRange { low, high } => write!(
                f,
                "acceptance band [{}, {}] must lie within [0, 1]",
                low, high
            ),
            Self::EmptyBand { low, high } => write!(
                f,
                "acceptance band low ({}) must be less than high ({})",
                low, high
            ),
            Self::ZeroTuneInterval => {
                write!(f, "tune interval must be at least one iteration")
            }
            Self::InvalidScale { param, scale } => write!(
                f,
                "initial scale for {} ({}) must be positive and finite",
                param, scale
            ),
            Self::ZeroRadius => {
                write!(f, "local tau walk radius must be at least one")
            }
            Self::InvalidInitialState { state } => {
                write!(f, "initial state {} is out of support", state)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_basic_impls;

    test_basic_impls!(SamplerConfig::default());

    #[test]
    fn default_is_valid() {
        assert_eq!(SamplerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_bad_bands() {
        let config =
            SamplerConfig::new().with_band(AcceptanceBand::new(0.5, 0.2));
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyBand {
                low: 0.5,
                high: 0.2
            })
        );

        let config =
            SamplerConfig::new().with_band(AcceptanceBand::new(-0.1, 0.2));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BandOutOfRange { .. })
        ));

        let config =
            SamplerConfig::new().with_band(AcceptanceBand::new(0.1, f64::NAN));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BandOutOfRange { .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_scales() {
        let config = SamplerConfig::new()
            .with_initial_scales(ProposalScale::new(1.0, 0.0));
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidScale {
                param: Param::Lambda2,
                scale: 0.0
            })
        );
    }

    #[test]
    fn validate_rejects_zero_radius() {
        let config = SamplerConfig::new()
            .with_tau_proposal(TauProposal::LocalWalk { radius: 0 });
        assert_eq!(config.validate(), Err(ConfigError::ZeroRadius));
    }

    #[test]
    fn budget_exhaustion() {
        let zero = Duration::from_secs(0);
        assert!(!Budget::unlimited().is_exhausted(usize::MAX, Duration::MAX));
        assert!(Budget::iterations(10).is_exhausted(10, zero));
        assert!(!Budget::iterations(10).is_exhausted(9, zero));
        let budget = Budget::duration(Duration::from_millis(5));
        assert!(budget.is_exhausted(0, Duration::from_millis(5)));
        assert!(!budget.is_exhausted(0, Duration::from_millis(4)));
    }
}
