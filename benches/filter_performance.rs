//! Filter Parser Performance Benchmarks
//!
//! Measures parse and evaluate cost for the RFC 7644 filter grammar across
//! increasingly complex expressions and resource sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scim_gateway::filter::{evaluate_filter, FilterParser};
use serde_json::{json, Value};

fn simple_filter() -> &'static str {
    r#"userName eq "jdoe""#
}

fn compound_filter() -> &'static str {
    r#"(active eq true and userName sw "j") or (emails.value co "example.com" and externalId pr)"#
}

fn deeply_nested_filter() -> &'static str {
    r#"(((active eq true or active eq false) and userName pr) or (not (externalId pr))) and emails.value ew ".com""#
}

fn test_resource(id: usize) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "id": format!("user-{id}"),
        "userName": format!("user{id}"),
        "active": id % 2 == 0,
        "externalId": format!("ext-{id}"),
        "emails": [{"value": format!("user{id}@example.com"), "type": "work", "primary": true}],
    })
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_parse");
    for (label, filter) in [
        ("simple", simple_filter()),
        ("compound", compound_filter()),
        ("deeply_nested", deeply_nested_filter()),
    ] {
        group.bench_with_input(BenchmarkId::new("parse", label), filter, |b, filter| {
            b.iter(|| {
                let result = FilterParser::parse(black_box(filter));
                let _ = black_box(result);
            });
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_evaluate");
    for size in [1, 100, 1000] {
        group.throughput(Throughput::Elements(size as u64));
        let resources: Vec<Value> = (0..size).map(test_resource).collect();
        let expr = FilterParser::parse(compound_filter()).unwrap();

        group.bench_with_input(BenchmarkId::new("compound_filter", size), &size, |b, _| {
            b.iter(|| {
                for resource in &resources {
                    let matched = evaluate_filter(black_box(&expr), black_box(resource));
                    let _ = black_box(matched);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate);
criterion_main!(benches);
