//! Bayesian inference of a single changepoint in a series of daily counts.
//!
//! Given counts `c[0], ..., c[N-1]`, the model assumes the counts are Poisson
//! with rate `λ1` before an unknown day `τ` and rate `λ2` from `τ` on. A
//! Metropolis-within-Gibbs sampler draws from the joint posterior of
//! `(λ1, λ2, τ)`, and the draws are summarized into expected daily rates,
//! probabilities of a rate difference, and conditional expectations.
//!
//! # Example
//!
//! Did the rate go up?
//!
//! ```
//! use switchpoint::prelude::*;
//!
//! let series = ObservationSeries::new(vec![
//!     3, 4, 2, 5, 3, 4, 3, 2, 4, 3, 12, 14, 11, 13, 15, 12, 14, 13, 12, 11,
//! ]);
//! let config = SamplerConfig::new()
//!     .with_n_tune(1_000)
//!     .with_n_samples(2_000)
//!     .with_seed(1337);
//!
//! let outcome = sample(&series, &config).unwrap();
//! let posterior = Posterior::new(&outcome.trace).unwrap();
//!
//! // The changepoint is almost certainly on day 10
//! assert!((posterior.mean(Param::Tau) - 10.0).abs() < 1.0);
//! assert!(posterior.probability_difference_at_least(5.0) > 0.95);
//!
//! let rates = posterior.expected_rate_per_day();
//! assert!(rates[15] > 2.0 * rates[5]);
//! ```
//!
//! # Logging
//!
//! The crate emits [`tracing`] events (phase changes and tuning at `debug`,
//! chain completion at `info`, truncation and rejected input at `warn`) and
//! never installs a subscriber.

pub mod chains;
pub mod consts;
pub mod data;
pub mod diagnostics;
pub mod dist;
pub mod misc;
pub mod model;
pub mod posterior;
pub mod prelude;
pub mod proposal;
pub mod sampler;
pub mod trace;
pub mod traits;

/// Implement `Display` for a type that implements `From<&T> for String`
#[macro_export]
macro_rules! impl_display {
    ($kind: ty) => {
        impl ::std::fmt::Display for $kind {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(f, "{}", String::from(self))
            }
        }
    };
}
