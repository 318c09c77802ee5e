use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ewah_bitmap::EwahBitmap;
use std::hint::black_box;

fn strided(stride: usize, count: usize) -> EwahBitmap {
    EwahBitmap::from_sorted((0..count).map(|i| i * stride)).unwrap()
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");

    for stride in &[1, 3, 64, 1000] {
        group.bench_with_input(BenchmarkId::new("set", stride), stride, |b, &stride| {
            b.iter(|| {
                let mut bitmap = EwahBitmap::new();
                for i in 0..10_000 {
                    bitmap.set(black_box(i * stride)).unwrap();
                }
                bitmap
            });
        });
    }

    group.bench_function("from_words", |b| {
        let words: Vec<u64> = (0..10_000u64)
            .map(|i| match i % 7 {
                0 | 1 => 0,
                2 => u64::MAX,
                _ => i.wrapping_mul(0x9E37_79B9_7F4A_7C15),
            })
            .collect();
        b.iter(|| EwahBitmap::from_words(black_box(&words).iter().copied()));
    });

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");

    let bitmap = strided(5, 100_000);
    group.bench_function("cardinality", |b| {
        b.iter(|| black_box(&bitmap).cardinality());
    });

    let mut i = 0;
    group.bench_function("get", |b| {
        b.iter(|| {
            black_box(bitmap.get(i % 500_000));
            i += 7;
        });
    });

    group.finish();
}

fn bench_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration");

    for stride in &[1, 2, 100, 10_000] {
        let bitmap = strided(*stride, 10_000);

        group.bench_with_input(BenchmarkId::new("positions", stride), &bitmap, |b, bitmap| {
            b.iter(|| {
                for bit in bitmap {
                    black_box(bit);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("to_vec", stride), &bitmap, |b, bitmap| {
            b.iter(|| black_box(bitmap.to_vec()));
        });

        group.bench_with_input(BenchmarkId::new("words", stride), &bitmap, |b, bitmap| {
            b.iter(|| {
                for word in bitmap.words() {
                    black_box(word);
                }
            });
        });
    }

    group.finish();
}

fn bench_pairwise(c: &mut Criterion) {
    let mut group = c.benchmark_group("pairwise");

    for stride in &[2, 65, 4096] {
        let a = strided(*stride, 20_000);
        let b = strided(*stride + 1, 20_000);

        group.bench_with_input(BenchmarkId::new("and", stride), &(&a, &b), |bench, (a, b)| {
            bench.iter(|| a.and(b));
        });
        group.bench_with_input(BenchmarkId::new("or", stride), &(&a, &b), |bench, (a, b)| {
            bench.iter(|| a.or(b));
        });
        group.bench_with_input(BenchmarkId::new("xor", stride), &(&a, &b), |bench, (a, b)| {
            bench.iter(|| a.xor(b));
        });
        group.bench_with_input(BenchmarkId::new("and_not", stride), &(&a, &b), |bench, (a, b)| {
            bench.iter(|| a.and_not(b));
        });
        group.bench_with_input(
            BenchmarkId::new("and_cardinality", stride),
            &(&a, &b),
            |bench, (a, b)| {
                bench.iter(|| a.and_cardinality(b));
            },
        );
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    let bitmap = strided(37, 50_000);
    let bytes = bitmap.to_le_bytes();

    group.bench_function("to_le_bytes", |b| {
        b.iter(|| black_box(&bitmap).to_le_bytes());
    });
    group.bench_function("from_le_bytes", |b| {
        b.iter(|| EwahBitmap::from_le_bytes(black_box(&bytes)).unwrap());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_construction,
    bench_queries,
    bench_iteration,
    bench_pairwise,
    bench_serialization
);
criterion_main!(benches);
