//! PII Redaction Performance Benchmarks
//!
//! Measures the structural-scan plus free-text-regex redaction cost this
//! crate pays on every audit entry, across payload sizes and PII density.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scim_gateway::redact::{redact_free_text, redact_json};
use serde_json::{json, Value};

fn user_snapshot(id: usize) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "id": format!("user-{id}"),
        "userName": format!("user{id}@example.com"),
        "active": true,
        "emails": [
            {"value": format!("user{id}@example.com"), "type": "work", "primary": true},
            {"value": format!("user{id}.personal@gmail.com"), "type": "home", "primary": false}
        ],
        "phoneNumbers": [{"value": format!("+1-555-{:04}", id % 10000), "type": "work"}],
        "addresses": [{"value": "123 Main St", "postalCode": "98052-6399"}],
    })
}

fn free_text_with_embedded_pii(id: usize) -> String {
    format!(
        "audit note for request {id}: contact user{id}@example.com or call +1-555-{:04}, \
         client observed from 192.168.1.{}",
        id % 10000,
        id % 255
    )
}

fn bench_redact_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("redact_json");
    for size in [1, 50, 500] {
        group.throughput(Throughput::Elements(size as u64));
        let snapshots: Vec<Value> = (0..size).map(user_snapshot).collect();

        group.bench_with_input(BenchmarkId::new("user_snapshot", size), &size, |b, _| {
            b.iter(|| {
                for snapshot in &snapshots {
                    let redacted = redact_json(black_box(snapshot));
                    let _ = black_box(redacted);
                }
            });
        });
    }
    group.finish();
}

fn bench_redact_free_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("redact_free_text");
    for size in [1, 50, 500] {
        group.throughput(Throughput::Elements(size as u64));
        let texts: Vec<String> = (0..size).map(free_text_with_embedded_pii).collect();

        group.bench_with_input(BenchmarkId::new("embedded_pii", size), &size, |b, _| {
            b.iter(|| {
                for text in &texts {
                    let redacted = redact_free_text(black_box(text));
                    let _ = black_box(redacted);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_redact_json, bench_redact_free_text);
criterion_main!(benches);
