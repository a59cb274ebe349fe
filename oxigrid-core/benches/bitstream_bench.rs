//! Performance benchmarks for the word-oriented bitstream
//!
//! This benchmark suite evaluates:
//! - Single-bit write and read throughput
//! - Multi-bit writes and reads across field widths
//! - Zero padding and skipping

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use oxigrid_core::bitstream::BitStream;
use std::hint::black_box;

/// Number of bits moved per iteration
const BITS: usize = 1 << 20;

/// Reproducible pseudo-random words
fn random_words(count: usize) -> Vec<u64> {
    let mut seed: u64 = 0x1234_5678_9ABC_DEF0;
    (0..count)
        .map(|_| {
            // Linear congruential generator
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            seed
        })
        .collect()
}

/// Benchmark single-bit writes and reads
fn bench_single_bits(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitstream_single_bits");
    group.throughput(Throughput::Bytes((BITS / 8) as u64));

    let words = random_words(BITS / 64);

    group.bench_function("write_bit", |b| {
        b.iter(|| {
            let mut stream = BitStream::with_capacity(BITS / 8);
            for &word in &words {
                for i in 0..64 {
                    stream.write_bit(black_box((word >> i) & 1 != 0)).unwrap();
                }
            }
            black_box(stream.flush().unwrap());
        });
    });

    let mut stream = BitStream::with_capacity(BITS / 8);
    for &word in &words {
        stream.write_bits(word, 64).unwrap();
    }
    let encoded = stream.into_inner();

    group.bench_function("read_bit", |b| {
        b.iter(|| {
            let mut stream = BitStream::new(black_box(&encoded[..]));
            let mut ones = 0u32;
            for _ in 0..BITS {
                ones += stream.read_bit().unwrap() as u32;
            }
            black_box(ones);
        });
    });

    group.finish();
}

/// Benchmark multi-bit fields of different widths
fn bench_field_widths(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitstream_field_widths");
    group.throughput(Throughput::Bytes((BITS / 8) as u64));

    let words = random_words(BITS);

    for width in [3u32, 12, 33, 64] {
        let count = BITS / width as usize;

        group.bench_with_input(BenchmarkId::new("write_bits", width), &width, |b, &width| {
            b.iter(|| {
                let mut stream = BitStream::with_capacity(BITS / 8 + 8);
                for &word in &words[..count] {
                    black_box(stream.write_bits(word, width).unwrap());
                }
                black_box(stream.flush().unwrap());
            });
        });

        let mut stream = BitStream::with_capacity(BITS / 8 + 8);
        for &word in &words[..count] {
            stream.write_bits(word, width).unwrap();
        }
        stream.flush().unwrap();
        let encoded = stream.into_inner();

        group.bench_with_input(BenchmarkId::new("read_bits", width), &width, |b, &width| {
            b.iter(|| {
                let mut stream = BitStream::new(black_box(&encoded[..]));
                let mut acc = 0u64;
                for _ in 0..count {
                    acc ^= stream.read_bits(width).unwrap();
                }
                black_box(acc);
            });
        });
    }

    group.finish();
}

/// Benchmark padding and skipping, as used by fixed-rate blocks
fn bench_pad_skip(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitstream_pad_skip");
    group.throughput(Throughput::Bytes((BITS / 8) as u64));

    group.bench_function("pad", |b| {
        b.iter(|| {
            let mut stream = BitStream::with_capacity(BITS / 8);
            for _ in 0..BITS / 1000 {
                stream.write_bit(true).unwrap();
                stream.pad(black_box(999)).unwrap();
            }
            black_box(stream.flush().unwrap());
        });
    });

    let encoded = vec![0u8; BITS / 8];
    group.bench_function("skip", |b| {
        b.iter(|| {
            let mut stream = BitStream::new(black_box(&encoded[..]));
            for _ in 0..BITS / 1000 {
                black_box(stream.read_bit().unwrap());
                stream.skip(999).unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_single_bits, bench_field_widths, bench_pad_skip);
criterion_main!(benches);
