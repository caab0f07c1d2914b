//! Independent chains run in parallel
use crate::data::ObservationSeries;
use crate::model::ChangepointModel;
use crate::sampler::{ChainOutcome, MetropolisSampler, SamplerConfig, SamplerError};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

/// The random stream of chain `chain_ix`: the stream seeded from `seed`,
/// advanced by `chain_ix` long jumps (2^192 draws each), so chains never
/// overlap.
pub fn chain_rng(seed: u64, chain_ix: usize) -> Xoshiro256PlusPlus {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..chain_ix).for_each(|_| rng.long_jump());
    rng
}

/// Run `n_chains` independent chains over `series` on the rayon thread pool.
///
/// Every chain uses `config` except for its random stream, which comes from
/// [`chain_rng`] with `config.seed`. Chain 0 therefore reproduces
/// [`sample`](crate::sampler::sample) with the same config. The outcomes are
/// returned in chain order regardless of scheduling.
///
/// # Example
///
/// ```
/// use switchpoint::chains::run_chains;
/// use switchpoint::data::ObservationSeries;
/// use switchpoint::sampler::SamplerConfig;
///
/// let series = ObservationSeries::new(vec![1, 2, 1, 0, 2, 7, 9, 8, 6, 7]);
/// let config = SamplerConfig::new().with_n_tune(200).with_n_samples(200);
///
/// let outcomes = run_chains(&series, &config, 3).unwrap();
/// assert_eq!(outcomes.len(), 3);
/// assert_ne!(outcomes[0].trace, outcomes[1].trace);
/// ```
pub fn run_chains(
    series: &ObservationSeries,
    config: &SamplerConfig,
    n_chains: usize,
) -> Result<Vec<ChainOutcome>, SamplerError> {
    let model = ChangepointModel::new(series)?;
    config.validate()?;

    tracing::debug!(n_chains, seed = config.seed, "starting chains");

    (0..n_chains)
        .into_par_iter()
        .map(|chain_ix| {
            let rng = chain_rng(config.seed, chain_ix);
            let sampler =
                MetropolisSampler::with_rng(&model, config.clone(), rng)?;
            sampler.run()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InvalidModelError;
    use crate::sampler::sample;
    use rand::Rng;

    fn series() -> ObservationSeries {
        ObservationSeries::new(vec![
            3, 1, 2, 4, 2, 3, 1, 2, 3, 2, 9, 11, 8, 12, 10, 9, 13, 10, 11, 9,
        ])
    }

    fn config() -> SamplerConfig {
        SamplerConfig::new()
            .with_n_tune(300)
            .with_n_samples(400)
            .with_seed(99)
    }

    #[test]
    fn chain_zero_matches_single_chain() {
        let outcomes = run_chains(&series(), &config(), 2).unwrap();
        let single = sample(&series(), &config()).unwrap();
        assert_eq!(outcomes[0], single);
    }

    #[test]
    fn chains_are_reproducible_and_distinct() {
        let a = run_chains(&series(), &config(), 4).unwrap();
        let b = run_chains(&series(), &config(), 4).unwrap();
        assert_eq!(a, b);
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert_ne!(a[i].trace, a[j].trace);
            }
        }
    }

    #[test]
    fn chain_streams_differ() {
        let mut r0 = chain_rng(5, 0);
        let mut r1 = chain_rng(5, 1);
        let x0: u64 = r0.gen();
        let x1: u64 = r1.gen();
        assert_ne!(x0, x1);
    }

    #[test]
    fn zero_chains_is_empty() {
        assert!(run_chains(&series(), &config(), 0).unwrap().is_empty());
    }

    #[test]
    fn model_errors_surface_before_any_chain_runs() {
        let err =
            run_chains(&ObservationSeries::new(vec![4]), &config(), 3)
                .unwrap_err();
        assert_eq!(
            err,
            SamplerError::InvalidModel(InvalidModelError::TooFewDays {
                n_days: 1
            })
        );
    }
}
