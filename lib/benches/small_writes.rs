use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::RngCore;
use std::{hint::black_box, io::Write};
use zbatch::{EncodeOptions, Level};

const INPUT_LEN: usize = 256 * 1024;

fn inputs() -> [(&'static str, Vec<u8>); 3] {
    let count = (0..INPUT_LEN).map(|i| (i % 255) as u8).collect();
    let mut random = vec![0u8; INPUT_LEN];
    rand::rng().fill_bytes(&mut random);

    [
        ("all-zeros", vec![0; INPUT_LEN]),
        ("count", count),
        ("random", random),
    ]
}

fn single_byte_writes(input: &[u8]) -> Vec<u8> {
    let mut enc = EncodeOptions::new()
        .level(Level::Fastest)
        .into_encoder(Vec::new())
        .unwrap();

    for b in input {
        enc.write_all(std::slice::from_ref(b)).unwrap();
    }

    enc.finish().unwrap()
}

fn bulk_write(input: &[u8]) -> Vec<u8> {
    let mut enc = EncodeOptions::new()
        .level(Level::Fastest)
        .into_encoder(Vec::new())
        .unwrap();

    enc.write_all(input).unwrap();
    enc.finish().unwrap()
}

#[allow(clippy::cast_precision_loss)]
fn ratio(compressed: &[u8], input: &[u8]) -> f64 {
    compressed.len() as f64 / input.len() as f64
}

fn small_write_stream_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("small_write_stream_compression");
    group.throughput(Throughput::Bytes(INPUT_LEN as u64));

    for (name, input) in inputs() {
        let compressed = single_byte_writes(&input);
        println!(
            "{name}: {:.4} compressed bytes per input byte",
            ratio(&compressed, &input)
        );

        group.bench_with_input(BenchmarkId::new("single_byte", name), &input, |b, input| {
            b.iter(|| single_byte_writes(black_box(input)));
        });
        group.bench_with_input(BenchmarkId::new("bulk", name), &input, |b, input| {
            b.iter(|| bulk_write(black_box(input)));
        });
    }

    group.finish();
}

criterion_group!(benches, small_write_stream_compression);
criterion_main!(benches);
