use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use objscope::analysis::interval::IntervalMap;
use objscope::core::range::Range;
use std::hint::black_box;

/// Contiguous rows of `width` bytes starting at `base`.
fn rows(base: u64, count: u64, width: u64) -> IntervalMap<u64> {
    (0..count)
        .filter_map(|i| Range::with_len(base + i * width, width).map(|r| (r, i)))
        .collect()
}

fn bench_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("interval_join");
    for count in [256u64, 4096, 65536] {
        let sp = rows(0x40_0000, count, 8);
        let idx = rows(0x40_0000, count / 2, 16);
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| sp.join(&idx, |_, a, b| a + b))
        });
    }
    group.finish();
}

fn bench_intersecting(c: &mut Criterion) {
    let mut group = c.benchmark_group("interval_intersecting");
    let insts = rows(0x40_0000, 65536, 4);
    for count in [16u64, 256, 4096] {
        let queries: Vec<Range> = (0..count)
            .filter_map(|i| Range::with_len(0x40_0000 + i * 64, 12))
            .collect();
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &queries, |b, q| {
            b.iter(|| black_box(insts.intersecting(q)).len())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_join, bench_intersecting);
criterion_main!(benches);
