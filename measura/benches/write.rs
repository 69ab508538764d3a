//! Microbenchmarks for the metric write pipeline.
//!
//! Measures casting, point construction and a full write through the
//! in-memory client.
//!
//! Run with: `cargo bench -p measura -- write`

#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use measura::schema::Schema;
use measura::{FieldOptions, FieldType, MemoryClient, Metric, Precision, SchemaBuilder, Value};

/// Creates a schema with `fields` float fields and four tags.
fn setup_schema(fields: usize) -> Arc<Schema> {
    SchemaBuilder::new("BenchMetrics")
        .retention("bench")
        .tag("host", FieldOptions::new().with_default("bench-host"))
        .tags(["region", "zone"], FieldOptions::new())
        .tag("core", FieldOptions::typed(FieldType::Integer))
        .fields(
            (0..fields).map(|i| format!("value_{i}")),
            FieldOptions::typed(FieldType::Float),
        )
        .build()
}

fn populated(schema: &Arc<Schema>, fields: usize) -> Metric {
    let mut metric = Metric::new(schema);
    for i in 0..fields {
        metric
            .set(&format!("value_{i}"), Value::from(i.to_string()))
            .unwrap();
    }
    metric.set("core", "3").unwrap();
    metric.set_timestamp(1_700_000_000);
    metric
}

fn bench_cast(c: &mut Criterion) {
    let value = Value::from("12.5e3 units");

    c.bench_function("cast/float_from_text", |b| {
        b.iter(|| black_box(&value).cast(black_box(FieldType::Float)));
    });
    c.bench_function("cast/integer_from_text", |b| {
        b.iter(|| black_box(&value).cast(black_box(FieldType::Integer)));
    });
}

fn bench_point(c: &mut Criterion) {
    let mut group = c.benchmark_group("point/field_count");

    for count in [1, 10, 50] {
        let schema = setup_schema(count);
        let metric = populated(&schema, count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| metric.point(black_box(Precision::Nanoseconds)).unwrap());
        });
    }

    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write/field_count");

    for count in [1, 10, 50] {
        let schema = setup_schema(count);
        let template = populated(&schema, count);
        let client = MemoryClient::new();

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let mut metric = template.duplicate();
                metric.set_timestamp(1_700_000_000);
                metric.write(black_box(&client)).unwrap();
            });
            client.clear();
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cast, bench_point, bench_write);
criterion_main!(benches);
