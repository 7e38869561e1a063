use std::hint::black_box;
use std::time::Duration;

use bench::{apply_large_runtime_config, apply_small_runtime_config, default_rng, thread_counts};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use parsort::{SortStrategy, all_strategies, fill_random, sort_strategy, strategy_name};
use rand::Rng;

const BENCH_SIZES: [usize; 3] = [65_536, 262_144, 1_048_576];

#[derive(Clone, Copy)]
enum Distribution {
    IndexSeeded,
    Duplicates16,
}

impl Distribution {
    fn label(self) -> &'static str {
        match self {
            Self::IndexSeeded => "index_seeded",
            Self::Duplicates16 => "duplicates_16",
        }
    }

    fn generate(self, size: usize) -> Vec<u32> {
        match self {
            Self::IndexSeeded => {
                let mut data = vec![0u32; size];
                fill_random(&mut data);
                data
            }
            Self::Duplicates16 => {
                let mut rng = default_rng();
                (0..size).map(|_| (rng.random::<u32>() % 16) * 17).collect()
            }
        }
    }
}

const DISTRIBUTIONS: [Distribution; 2] = [Distribution::IndexSeeded, Distribution::Duplicates16];

fn bench_strategies(c: &mut Criterion) {
    for &dist in &DISTRIBUTIONS {
        let mut group = c.benchmark_group(format!("sort/{}", dist.label()));
        apply_large_runtime_config(&mut group);

        for &size in &BENCH_SIZES {
            let base = dist.generate(size);

            for &strategy in all_strategies() {
                group.bench_function(
                    BenchmarkId::new(strategy_name(strategy), size),
                    |bencher| {
                        bencher.iter_custom(|iters| {
                            let mut total = Duration::ZERO;
                            for _ in 0..iters {
                                let mut data = base.clone();
                                let start = std::time::Instant::now();
                                sort_strategy(strategy, &mut data).unwrap();
                                total += start.elapsed();
                                black_box(&data);
                            }
                            total
                        });
                    },
                );
            }

            group.bench_function(BenchmarkId::new("std_unstable", size), |bencher| {
                bencher.iter_custom(|iters| {
                    let mut total = Duration::ZERO;
                    for _ in 0..iters {
                        let mut data = base.clone();
                        let start = std::time::Instant::now();
                        data.sort_unstable();
                        total += start.elapsed();
                        black_box(&data);
                    }
                    total
                });
            });
        }
        group.finish();
    }
}

fn bench_thread_scaling(c: &mut Criterion) {
    const SIZE: usize = 1_048_576;
    let base = Distribution::IndexSeeded.generate(SIZE);

    for &strategy in &[SortStrategy::Hybrid, SortStrategy::HybridTaskloop] {
        let mut group = c.benchmark_group(format!("scaling/{}", strategy_name(strategy)));
        apply_small_runtime_config(&mut group);

        for threads in thread_counts() {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .expect("failed to build rayon pool");

            group.bench_function(BenchmarkId::from_parameter(threads), |bencher| {
                bencher.iter_custom(|iters| {
                    let mut total = Duration::ZERO;
                    for _ in 0..iters {
                        let mut data = base.clone();
                        let start = std::time::Instant::now();
                        pool.install(|| sort_strategy(strategy, &mut data)).unwrap();
                        total += start.elapsed();
                        black_box(&data);
                    }
                    total
                });
            });
        }
        group.finish();
    }
}

criterion_group!(benches, bench_strategies, bench_thread_scaling);
criterion_main!(benches);
