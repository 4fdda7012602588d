use criterion::*;
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sim_engine::jobs::system::JobSystem;

mod common;
use common::*;

fn jobs_benchmark(c: &mut Criterion) {
    init_components();

    let mut group = c.benchmark_group("jobs");
    group.sample_size(20);

    for &(label, n) in &[("schedule_10k", 10_000usize), ("schedule_100k", 100_000usize)] {
        let system = JobSystem::new();

        group.bench_function(label, |b| {
            b.iter(|| {
                let counter = Arc::new(AtomicUsize::new(0));
                for _ in 0..n {
                    let counter = Arc::clone(&counter);
                    let handle = system.create(move || {
                        counter.fetch_add(1, Ordering::Relaxed);
                    });
                    system.schedule(handle);
                }
                system.wait_all();
                black_box(counter.load(Ordering::Relaxed));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, jobs_benchmark);
criterion_main!(benches);
