//! Re-imports for convenience
#[doc(no_inline)]
pub use crate::chains::run_chains;
#[doc(no_inline)]
pub use crate::data::{LoadReport, ObservationSeries};
#[doc(no_inline)]
pub use crate::diagnostics::{chain_rhats, effective_sample_size, rhat};
#[doc(no_inline)]
pub use crate::dist::*;
#[doc(no_inline)]
pub use crate::model::{ChangepointModel, Param, ParameterState};
#[doc(no_inline)]
pub use crate::posterior::{
    Comparison, Condition, Posterior, PosteriorSummary,
    DEFAULT_DIFFERENCE_THRESHOLDS,
};
#[doc(no_inline)]
pub use crate::proposal::{AcceptanceBand, ProposalScale, TauProposal};
#[doc(no_inline)]
pub use crate::sampler::{
    sample, Budget, ChainOutcome, MetropolisSampler, Phase, SamplerConfig,
    SamplerError,
};
#[doc(no_inline)]
pub use crate::trace::Trace;
#[doc(no_inline)]
pub use crate::traits::*;
