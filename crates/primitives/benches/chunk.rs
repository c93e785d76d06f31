#![allow(missing_docs)]
use alloy_primitives::B256;
use alloy_signer_local::PrivateKeySigner;
use apiary_primitives::{AnyChunk, Chunk, ContentChunk, SingleOwnerChunk, bmt::Hasher};
use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::prelude::*;

pub fn chunks(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk");
    let mut rng = rand::rng();
    let random_data: Vec<u8> = (0..4096).map(|_| rng.random::<u8>()).collect();

    for size in [128, 1024, 4096] {
        let data = random_data[..size].to_vec();
        group.bench_with_input(BenchmarkId::new("bmt_by_size", size), &data, |b, data| {
            b.iter(|| {
                let mut hasher = Hasher::new();
                hasher.set_span(data.len() as u64);
                hasher.update(data);
                black_box(hasher.sum());
            });
        });
    }

    group.bench_function("content_address_4096", |b| {
        b.iter(|| {
            let chunk = ContentChunk::new(random_data.clone()).unwrap();
            black_box(*chunk.address());
        })
    });

    let signer = PrivateKeySigner::random();
    let soc: Bytes = SingleOwnerChunk::new(B256::repeat_byte(1), random_data.clone(), &signer)
        .unwrap()
        .into();
    group.bench_function("parse_single_owner_4096", |b| {
        b.iter(|| {
            let chunk = AnyChunk::parse(soc.clone()).unwrap();
            black_box(*chunk.address());
        })
    });

    group.finish();
}

criterion_group!(benches, chunks);
criterion_main!(benches);
