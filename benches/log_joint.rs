use criterion::BatchSize;
use criterion::Criterion;
use criterion::{criterion_group, criterion_main};
use rand::Rng;
use switchpoint::data::ObservationSeries;
use switchpoint::model::{ChangepointModel, ParameterState};
use switchpoint::traits::*;

fn series(n_days: usize) -> ObservationSeries {
    let mut rng = rand::thread_rng();
    (0..n_days).map(|_| rng.gen_range(0..40_u32)).collect()
}

fn bench_log_joint(c: &mut Criterion) {
    let mut group = c.benchmark_group("ChangepointModel log_joint");
    for n_days in [10, 100, 1_000, 10_000] {
        let model = ChangepointModel::new(&series(n_days)).unwrap();
        group.bench_function(&format!("n_days = {}", n_days), |b| {
            b.iter_batched_ref(
                rand::thread_rng,
                |rng| {
                    let state = ParameterState::new(
                        rng.gen_range(1.0..30.0),
                        rng.gen_range(1.0..30.0),
                        rng.gen_range(0..n_days),
                    );
                    model.log_joint(&state)
                },
                BatchSize::SmallInput,
            )
        });
    }
}

fn bench_prior_draw(c: &mut Criterion) {
    let model = ChangepointModel::new(&series(100)).unwrap();
    c.bench_function("ChangepointModel prior draw", |b| {
        b.iter_batched_ref(
            rand::thread_rng,
            |rng| {
                let _state: ParameterState = model.draw(rng);
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(log_joint_benches, bench_log_joint, bench_prior_draw);
criterion_main!(log_joint_benches);
