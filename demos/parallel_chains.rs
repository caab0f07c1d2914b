//! Run several chains on the text-message data and check that they agree.
//!
//! Run with `cargo run --release --example parallel_chains [n_chains]`.
use switchpoint::prelude::*;
use tracing_subscriber::EnvFilter;

const TXTDATA: &str = include_str!("txtdata.csv");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let n_chains: usize = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 4,
    };

    let series = ObservationSeries::from_text(TXTDATA).series;
    let config = SamplerConfig::new()
        .with_seed(0xC0FFEE)
        .with_budget(Budget::duration(std::time::Duration::from_secs(30)));

    let outcomes = run_chains(&series, &config, n_chains)?;

    println!("chain  samples  truncated  acc(λ1)  acc(λ2)  acc(τ)  E[τ]");
    for (ix, outcome) in outcomes.iter().enumerate() {
        let rate = |param| outcome.acceptance.rate(param).unwrap_or(f64::NAN);
        let tau_mean = Posterior::new(&outcome.trace)
            .map(|p| p.mean(Param::Tau))
            .unwrap_or(f64::NAN);
        println!(
            "{:>5}  {:>7}  {:>9}  {:>7.3}  {:>7.3}  {:>6.3}  {:.2}",
            ix,
            outcome.trace.len(),
            outcome.truncated,
            rate(Param::Lambda1),
            rate(Param::Lambda2),
            rate(Param::Tau),
            tau_mean,
        );
    }
    println!();

    match chain_rhats(&outcomes) {
        Some(rhats) => {
            for param in Param::ALL {
                println!("R-hat({}) = {:.4}", param, rhats.get(param));
            }
            if rhats.is_converged(1.01) {
                println!("chains agree");
            } else {
                println!("chains disagree; consider more samples");
            }
        }
        None => println!("R-hat needs at least one chain with four samples"),
    }

    if let Some(outcome) = outcomes.first() {
        for param in Param::ALL {
            if let Some(ess) = effective_sample_size(&outcome.trace.values(param)) {
                println!("ESS({}) in chain 0 = {:.0}", param, ess);
            }
        }
    }

    Ok(())
}
