use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rand::Rng;
use rayon::prelude::*;
use samplesort::prelude::*;
use std::hint::black_box;

fn bench_random_u64(c: &mut Criterion) {
    let mut group = c.benchmark_group("1M Random u64");
    group.sample_size(10);

    let mut rng = rand::rng();
    let count = 1_000_000;
    let input: Vec<u64> = (0..count).map(|_| rng.random()).collect();

    group.bench_function("sample_sort (copying)", |b| {
        b.iter_batched(
            || input.clone(),
            |data| sample_sort(black_box(&data), &|a: &u64, b: &u64| a < b, false),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("sample_sort (in-place)", |b| {
        b.iter_batched(
            || input.clone(),
            |mut data| sample_sort_inplace(black_box(&mut data), &|a: &u64, b: &u64| a < b),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("slice::sort_unstable", |b| {
        b.iter_batched(
            || input.clone(),
            |mut data| data.sort_unstable(),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("rayon par_sort_unstable", |b| {
        b.iter_batched(
            || input.clone(),
            |mut data| data.par_sort_unstable(),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_few_distinct_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("1M Few Distinct Keys");
    group.sample_size(10);

    // heavy equal-key runs exercise the pivot-equality paths
    let mut rng = rand::rng();
    let count = 1_000_000;
    let input: Vec<u64> = (0..count).map(|_| rng.random::<u64>() % 16).collect();

    group.bench_function("sample_sort (copying)", |b| {
        b.iter_batched(
            || input.clone(),
            |data| sample_sort(black_box(&data), &|a: &u64, b: &u64| a < b, false),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("sample_sort (in-place)", |b| {
        b.iter_batched(
            || input.clone(),
            |mut data| sample_sort_inplace(black_box(&mut data), &|a: &u64, b: &u64| a < b),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("slice::sort_unstable", |b| {
        b.iter_batched(
            || input.clone(),
            |mut data| data.sort_unstable(),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_random_u64, bench_few_distinct_keys);
criterion_main!(benches);
