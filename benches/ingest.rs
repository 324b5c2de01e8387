//! Benchmarks for Ratemeter ingest and snapshot cost

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ratemeter::{MetricSet, Record, ReporterConfig, Schema};
use std::time::Duration;

const OBSERVATIONS: u64 = 1000;

fn counter_schema() -> Schema {
    Schema::builder()
        .counter("Ops", "iter,cum,total")
        .counter("Bytes", "iter,total")
        .build()
}

fn compile(schema: &Schema) -> MetricSet {
    MetricSet::compile(schema, &ReporterConfig::default()).unwrap()
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    group.throughput(Throughput::Elements(OBSERVATIONS));

    let schema = counter_schema();

    group.bench_function("single_record", |b| {
        let mut set = compile(&schema);
        b.iter(|| {
            for i in 0..OBSERVATIONS {
                let record = Record::new(vec![5u64.into(), (i as f64 * 0.1).into()]);
                set.ingest(black_box(&record)).unwrap();
            }
        })
    });

    // Callers summing observations locally and ingesting every `batch`
    for batch in [10u64, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("pre_aggregated", batch),
            &batch,
            |b, &batch| {
                let mut set = compile(&schema);
                b.iter(|| {
                    let mut ops = 0u64;
                    let mut bytes = 0.0f64;
                    for i in 0..OBSERVATIONS {
                        ops += 5;
                        bytes += i as f64 * 0.1;
                        if i % batch == batch - 1 {
                            let record = Record::new(vec![ops.into(), bytes.into()]);
                            set.ingest(black_box(&record)).unwrap();
                            ops = 0;
                            bytes = 0.0;
                        }
                    }
                })
            },
        );
    }

    group.finish();
}

fn bench_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency");
    group.throughput(Throughput::Elements(OBSERVATIONS));

    let schema = Schema::builder()
        .latency("Latency", "w50,w99,c50,c99.9")
        .build();

    group.bench_function("ingest_1000_latencies", |b| {
        let mut set = compile(&schema);
        b.iter(|| {
            for i in 0..OBSERVATIONS {
                let record = Record::new(vec![((i * 37) % 200).into()]);
                set.ingest(black_box(&record)).unwrap();
            }
        })
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut set = compile(&counter_schema());
    for i in 0..OBSERVATIONS {
        set.ingest(&Record::new(vec![1u64.into(), (i as f64).into()]))
            .unwrap();
    }

    let second = Duration::from_secs(1);
    c.bench_function("snapshot", |b| {
        b.iter(|| black_box(set.snapshot(second, second).unwrap()))
    });
}

criterion_group!(benches, bench_ingest, bench_latency, bench_snapshot);
criterion_main!(benches);
