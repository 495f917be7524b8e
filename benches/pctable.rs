use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use objscope::functab::PcTable;

fn put_uvarint(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

/// A table of `rows` entries alternating between two frame sizes.
fn encoded(rows: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut prev = -1i64;
    for i in 0..rows {
        let value = if i % 2 == 0 { 8 } else { 24 };
        let delta = value - prev;
        put_uvarint(&mut out, ((delta << 1) ^ (delta >> 63)) as u64);
        put_uvarint(&mut out, 1 + (i as u64 % 7));
        prev = value;
    }
    out.push(0);
    out
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("pctable");
    for rows in [64usize, 1024, 16384] {
        let data = encoded(rows);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_function(format!("decode/{rows}"), |b| {
            b.iter(|| PcTable::decode(&data, 0x40_1000, 1))
        });
        if let Ok(table) = PcTable::decode(&data, 0x40_1000, 1) {
            group.bench_function(format!("lookup/{rows}"), |b| {
                b.iter(|| table.lookup(0x40_1000 + rows as u64))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
