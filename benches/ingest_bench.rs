use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use formpipe::{IngestConfig, coerce, ingest_bytes};
use std::hint::black_box;
use tokio::runtime::Runtime;

mod common;
use common::{content_type, file_form, text_form};

fn runtime() -> Runtime {
    Runtime::new().expect("tokio runtime")
}

/// Benchmark coercion of each value shape
fn bench_coerce(c: &mut Criterion) {
    let config = IngestConfig::default();
    let mut group = c.benchmark_group("coerce");

    for (label, raw) in [
        ("string", "just some text"),
        ("number", "-1234.5e-3"),
        ("boolean", "false"),
        ("json", r#"{"a":[1,2,3],"b":{"c":null}}"#),
        ("broken_json", "{not json at all"),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| coerce(black_box(raw), black_box(&config)));
        });
    }

    group.finish();
}

/// Benchmark ingest with different field counts
fn bench_ingest_fields(c: &mut Criterion) {
    let rt = runtime();
    let config = IngestConfig::default();
    let ct = content_type();
    let mut group = c.benchmark_group("ingest_fields");

    for count in [1usize, 10, 100] {
        let body = text_form(count);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_function(format!("fields_{count}"), |b| {
            b.iter(|| {
                rt.block_on(ingest_bytes(black_box(body.clone()), Some(&ct), &config))
                    .expect("ingest should succeed")
            });
        });
    }

    group.finish();
}

/// Benchmark ingest with different file sizes
fn bench_ingest_files(c: &mut Criterion) {
    let rt = runtime();
    let config = IngestConfig::default();
    let ct = content_type();
    let mut group = c.benchmark_group("ingest_files");

    for size in [1_000usize, 100_000, 1_000_000] {
        let body = file_form(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("bytes_{size}"), |b| {
            b.iter(|| {
                rt.block_on(ingest_bytes(black_box(body.clone()), Some(&ct), &config))
                    .expect("ingest should succeed")
            });
        });
    }

    group.finish();
}

/// Benchmark the reject-and-drain path
fn bench_ingest_rejected(c: &mut Criterion) {
    let rt = runtime();
    let config = IngestConfig {
        max_file_size: 1024,
        ..Default::default()
    };
    let ct = content_type();
    let body = file_form(1_000_000);
    let mut group = c.benchmark_group("ingest_rejected");
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("drain_1mb", |b| {
        b.iter(|| {
            rt.block_on(ingest_bytes(black_box(body.clone()), Some(&ct), &config))
                .expect_err("file exceeds limit")
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_coerce,
    bench_ingest_fields,
    bench_ingest_files,
    bench_ingest_rejected
);
criterion_main!(benches);
