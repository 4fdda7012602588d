use criterion::*;
use std::hint::black_box;

use sim_engine::engine::entity::EntityManager;

mod common;
use common::*;

fn iterate_benchmark(c: &mut Criterion) {
    init_components();

    let mut group = c.benchmark_group("iterate");
    group.sample_size(20);

    for &(label, n) in &[
        ("integrate_100k", AGENTS_SMALL),
        ("integrate_1M", AGENTS_MED),
    ] {
        let mut manager = EntityManager::new();
        populate(&mut manager, n);

        group.bench_function(label, |b| {
            b.iter(|| {
                manager
                    .each_rows::<(Position, Velocity), _>(|(position, velocity)| {
                        position.x += velocity.x;
                        position.y += velocity.y;
                    })
                    .unwrap();
                black_box(&mut manager);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, iterate_benchmark);
criterion_main!(benches);
