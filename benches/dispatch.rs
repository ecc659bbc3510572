use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use parfor::{ParallelConfig, ParallelFor, RayonTeam, Sum};

fn bench_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_reduce");
    let scoped = ParallelFor::new();
    let rayon = ParallelFor::with_team(ParallelConfig::default(), RayonTeam::global());

    for size in [512usize, 1 << 14, 1 << 20] {
        group.bench_with_input(BenchmarkId::new("scoped", size), &size, |b, &size| {
            b.iter(|| {
                let total: f64 = scoped.run_reduce(4, size, |_, _, i| (i as f64).sqrt(), &Sum);
                black_box(total)
            })
        });
        group.bench_with_input(BenchmarkId::new("rayon", size), &size, |b, &size| {
            b.iter(|| {
                let total: f64 = rayon.run_reduce(4, size, |_, _, i| (i as f64).sqrt(), &Sum);
                black_box(total)
            })
        });
    }
    group.finish();
}

fn bench_map_into(c: &mut Criterion) {
    let pf = ParallelFor::new();
    let mut out = vec![0.0f64; 1 << 20];
    c.bench_function("run_map_into/1M", |b| {
        b.iter(|| pf.run_map_into(4, black_box(&mut out), |_, _, i| (i as f64).sin()))
    });
}

criterion_group!(benches, bench_reduce, bench_map_into);
criterion_main!(benches);
