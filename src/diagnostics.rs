//! Convergence diagnostics for one or more chains
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::misc::mean_var;
use crate::model::Param;
use crate::sampler::ChainOutcome;

/// Chains shorter than this cannot be split for R-hat
const MIN_RHAT_LEN: usize = 4;
/// Chains shorter than this have no meaningful autocorrelation
const MIN_ESS_LEN: usize = 10;

/// Split-chain Gelman-Rubin statistic.
///
/// Each chain is truncated to the length of the shortest and cut in half,
/// and the halves are compared as separate chains. Values near 1 indicate
/// the chains agree.
///
/// Returns `None` when there are no chains, the shortest chain has fewer
/// than four values, or the within-chain variance is zero.
///
/// # Example
///
/// ```
/// use switchpoint::diagnostics::rhat;
///
/// let a: Vec<f64> = (0..100).map(|i| (i % 7) as f64).collect();
/// let b: Vec<f64> = (0..100).map(|i| (i % 5) as f64 + 1.0).collect();
/// let r = rhat(&[&a, &b]).unwrap();
/// assert!(r > 0.9 && r < 1.1);
///
/// let far: Vec<f64> = a.iter().map(|x| x + 100.0).collect();
/// assert!(rhat(&[&a, &far]).unwrap() > 2.0);
/// ```
pub fn rhat(chains: &[&[f64]]) -> Option<f64> {
    let n_min = chains.iter().map(|c| c.len()).min()?;
    if n_min < MIN_RHAT_LEN {
        return None;
    }

    let n_split = n_min / 2;
    let halves: Vec<(f64, f64)> = chains
        .iter()
        .flat_map(|c| [&c[..n_split], &c[n_split..2 * n_split]])
        .map(mean_var)
        .collect::<Option<_>>()?;
    let m = halves.len() as f64;
    let n = n_split as f64;

    // Within-chain variance
    let w = halves.iter().map(|(_, var)| var).sum::<f64>() / m;
    if !(w > 0.0) {
        return None;
    }

    // Between-chain variance
    let grand_mean = halves.iter().map(|(mean, _)| mean).sum::<f64>() / m;
    let b = n
        * halves
            .iter()
            .map(|(mean, _)| (mean - grand_mean).powi(2))
            .sum::<f64>()
        / (m - 1.0);

    let var_plus = (n - 1.0).mul_add(w, b) / n;
    Some((var_plus / w).sqrt())
}

/// Effective number of independent draws in a single chain, from the
/// initial positive sequence of autocorrelations.
///
/// Returns `None` for fewer than ten values or a constant chain.
pub fn effective_sample_size(xs: &[f64]) -> Option<f64> {
    if xs.len() < MIN_ESS_LEN {
        return None;
    }
    let (mean, var) = mean_var(xs)?;
    if !(var > 0.0) {
        return None;
    }

    let n = xs.len();
    let denom = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
    let sum_rho: f64 = (1..n / 2)
        .map(|lag| {
            xs.iter()
                .zip(xs[lag..].iter())
                .map(|(a, b)| (a - mean) * (b - mean))
                .sum::<f64>()
                / denom
        })
        .take_while(|&rho| rho > 0.0)
        .sum();

    Some(n as f64 / 2.0_f64.mul_add(sum_rho, 1.0))
}

/// R-hat for each model parameter
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct ParamRhat {
    pub lambda1: f64,
    pub lambda2: f64,
    pub tau: f64,
}

impl ParamRhat {
    pub fn get(&self, param: Param) -> f64 {
        match param {
            Param::Lambda1 => self.lambda1,
            Param::Lambda2 => self.lambda2,
            Param::Tau => self.tau,
        }
    }

    /// The worst (largest) R-hat
    pub fn max(&self) -> f64 {
        self.lambda1.max(self.lambda2).max(self.tau)
    }

    /// `true` if every parameter's R-hat is below `threshold`
    pub fn is_converged(&self, threshold: f64) -> bool {
        Param::ALL.iter().all(|&p| self.get(p) < threshold)
    }
}

/// Split R-hat of every parameter across the traces of `outcomes`.
///
/// A parameter that is constant across every chain, such as `tau` on a
/// series with an unmistakable change, is reported as exactly 1.
/// Returns `None` if R-hat cannot be computed for the traces.
pub fn chain_rhats(outcomes: &[ChainOutcome]) -> Option<ParamRhat> {
    let per_param = |param: Param| -> Option<f64> {
        let values: Vec<Vec<f64>> =
            outcomes.iter().map(|o| o.trace.values(param)).collect();
        let chains: Vec<&[f64]> = values.iter().map(|v| v.as_slice()).collect();
        rhat(&chains).or_else(|| {
            let first = *chains.first()?.first()?;
            let n_min = chains.iter().map(|c| c.len()).min()?;
            let constant = n_min >= MIN_RHAT_LEN
                && chains.iter().all(|c| c.iter().all(|&x| x == first));
            constant.then_some(1.0)
        })
    };

    Some(ParamRhat {
        lambda1: per_param(Param::Lambda1)?,
        lambda2: per_param(Param::Lambda2)?,
        tau: per_param(Param::Tau)?,
    })
}
