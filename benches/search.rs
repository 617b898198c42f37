use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use metadata_rag::retrieval::{DistanceMetric, IndexBuilder};
use std::hint::black_box;

const DIMENSION: usize = 384;

/// Deterministic pseudo-random vectors so runs are comparable.
fn vectors(count: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut state = seed;
    (0..count)
        .map(|_| {
            (0..DIMENSION)
                .map(|_| {
                    state = state
                        .wrapping_mul(6_364_136_223_846_793_005)
                        .wrapping_add(1_442_695_040_888_963_407);
                    ((state >> 40) as f32 / (1u64 << 24) as f32) - 0.5
                })
                .collect()
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let query = vectors(1, 7).remove(0);
    let mut group = c.benchmark_group("flat_search");

    for count in [1_000, 10_000] {
        for metric in [DistanceMetric::SquaredEuclidean, DistanceMetric::Cosine] {
            let index = IndexBuilder::new(metric)
                .build(&vectors(count, 42))
                .expect("benchmark index builds");
            group.bench_with_input(
                BenchmarkId::new(metric.to_string(), count),
                &index,
                |b, index| b.iter(|| index.search(black_box(&query), black_box(10))),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
