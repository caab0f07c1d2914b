//! Probability distributions used by the changepoint model
mod discrete_uniform;
mod exponential;
mod gaussian;
mod poisson;

pub use discrete_uniform::{DiscreteUniform, DiscreteUniformError, DuParam};
pub use exponential::{Exponential, ExponentialError};
pub use gaussian::{Gaussian, GaussianError};
pub use poisson::{Poisson, PoissonError};
