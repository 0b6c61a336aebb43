//! Benchmarks for feed decoding and store merges

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cryptraces_feed::{decode, PriceStore};

fn create_message(assets: usize) -> String {
    let fields: Vec<String> = (0..assets)
        .map(|i| format!("\"asset-{}\":\"{}.{:02}\"", i, 1000 + i, i % 100))
        .collect();
    format!("{{{}}}", fields.join(","))
}

fn benchmark_decode(c: &mut Criterion) {
    let small = create_message(5);
    let large = create_message(200);

    c.bench_function("decode_5_assets", |b| b.iter(|| decode(black_box(&small))));
    c.bench_function("decode_200_assets", |b| b.iter(|| decode(black_box(&large))));
}

fn benchmark_merge(c: &mut Criterion) {
    let store = PriceStore::new();
    let first = decode(&create_message(50)).unwrap();
    let second = decode(&create_message(50).replace("\"10", "\"20")).unwrap();

    c.bench_function("merge_50_assets", |b| {
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let update = if flip { first.clone() } else { second.clone() };
            store.merge(black_box(update))
        })
    });
}

criterion_group!(benches, benchmark_decode, benchmark_merge);
criterion_main!(benches);
