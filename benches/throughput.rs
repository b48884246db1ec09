//! Throughput Benchmark for respreader
//!
//! This benchmark measures how fast the reply reader turns buffered bytes
//! into values, for whole buffers and for the same bytes fed in small chunks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use respreader::protocol::{EncodingPolicy, ReaderConfig, ReplyReader};

/// Builds a pipeline of `count` replies of mixed types.
fn pipeline(count: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    for i in 0..count {
        match i % 4 {
            0 => buf.extend_from_slice(b"+OK\r\n"),
            1 => buf.extend_from_slice(format!(":{}\r\n", i).as_bytes()),
            2 => buf.extend_from_slice(b"$11\r\nsmall_value\r\n"),
            _ => buf.extend_from_slice(b"*2\r\n$3\r\nfoo\r\n*1\r\n$-1\r\n"),
        }
    }
    buf
}

/// Feeds `input` in `chunk`-sized pieces and drains every reply.
fn read_all(input: &[u8], chunk: usize, config: &ReaderConfig) -> usize {
    let mut reader = ReplyReader::with_config(config.clone());
    let mut replies = 0;
    for piece in input.chunks(chunk) {
        reader.feed(piece);
        while let Ok(Some(reply)) = reader.get_next_reply() {
            black_box(reply);
            replies += 1;
        }
    }
    replies
}

/// Benchmark a pipeline of small replies
fn bench_pipeline(c: &mut Criterion) {
    let input = pipeline(1000);
    let config = ReaderConfig::default();

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Bytes(input.len() as u64));

    group.bench_function("single_chunk", |b| {
        b.iter(|| read_all(black_box(&input), input.len(), &config));
    });

    group.bench_function("chunk_64", |b| {
        b.iter(|| read_all(black_box(&input), 64, &config));
    });

    group.bench_function("chunk_1", |b| {
        b.iter(|| read_all(black_box(&input), 1, &config));
    });

    group.finish();
}

/// Benchmark large bulk strings
fn bench_bulk(c: &mut Criterion) {
    let payload = "x".repeat(64 * 1024); // 64KB value
    let input = format!("${}\r\n{}\r\n", payload.len(), payload).into_bytes();

    let mut group = c.benchmark_group("bulk");
    group.throughput(Throughput::Bytes(input.len() as u64));

    let text = ReaderConfig::default();
    group.bench_function("bulk_64k_text", |b| {
        b.iter(|| read_all(black_box(&input), 4096, &text));
    });

    let raw = ReaderConfig::default().with_encoding(EncodingPolicy::Raw);
    group.bench_function("bulk_64k_raw", |b| {
        b.iter(|| read_all(black_box(&input), 4096, &raw));
    });

    group.finish();
}

/// Benchmark deeply nested arrays
fn bench_nested(c: &mut Criterion) {
    let depth = 16;
    let mut input = Vec::new();
    for _ in 0..depth {
        input.extend_from_slice(b"*2\r\n:1\r\n");
    }
    input.extend_from_slice(b":2\r\n");
    let config = ReaderConfig::default();

    let mut group = c.benchmark_group("nested");
    group.throughput(Throughput::Elements(1));

    group.bench_function("depth_16", |b| {
        b.iter(|| read_all(black_box(&input), input.len(), &config));
    });

    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_bulk, bench_nested);
criterion_main!(benches);
