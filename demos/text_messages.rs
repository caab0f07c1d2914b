//! Did a user's text-message habits change over 74 days, and when?
//!
//! Run with `cargo run --example text_messages [path/to/counts.csv]`. Set
//! `RUST_LOG=switchpoint=debug` to watch the sampler tune.
use switchpoint::prelude::*;
use tracing_subscriber::EnvFilter;

const TXTDATA: &str = include_str!("txtdata.csv");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let text = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => String::from(TXTDATA),
    };
    let LoadReport { series, rejected } = ObservationSeries::from_text(&text);
    if !rejected.is_empty() {
        eprintln!("skipped {} malformed records", rejected.len());
    }

    let config = SamplerConfig::new().with_seed(1337);
    let outcome = sample(&series, &config)?;
    let posterior = Posterior::new(&outcome.trace)?;
    let summary = posterior.summary(&DEFAULT_DIFFERENCE_THRESHOLDS);

    println!("{} days, {} posterior samples", series.len(), summary.n_samples);
    println!(
        "λ1 ≈ {:.2}, λ2 ≈ {:.2}, τ ≈ {:.1}",
        summary.lambda1_mean, summary.lambda2_mean, summary.tau_mean
    );
    println!();

    for (threshold, p) in summary.difference_probabilities.iter() {
        println!(
            "What is the probability the difference is larger than {}? {:.2}",
            threshold, p
        );
    }
    println!();

    println!(
        "percentage increase in text-message rates: {:.0}%",
        summary.expected_relative_increase * 100.0
    );
    println!();

    let before_45 = Condition::lt(Param::Tau, 45.0);
    match posterior.conditional_mean(Param::Lambda1, before_45) {
        Ok(mean) => println!("mean of λ1 given that τ is less than 45: {:.2}", mean),
        Err(err) => println!("{}", err),
    }
    println!();

    println!("day  observed  expected");
    summary
        .expected_rate_per_day
        .iter()
        .zip(series.iter())
        .enumerate()
        .for_each(|(day, (expected, observed))| {
            println!("{:>3}  {:>8}  {:>8.2}", day, observed, expected)
        });

    Ok(())
}
