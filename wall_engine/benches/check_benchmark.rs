//! Criterion benchmarks for the SQL wall engine.
//!
//! Measures a full check (parse + traversal) of representative application
//! queries, and a parallel batch.

use criterion::{criterion_group, criterion_main, Criterion};
use sqlwall_engine::{Dialect, Firewall, PolicyConfig};

const REPORT_QUERY: &str = "SELECT o.id, o.total, c.name \
    FROM orders o JOIN customers c ON o.customer_id = c.id \
    WHERE o.status IN ('open', 'held') AND o.created_at > '2024-01-01' \
    GROUP BY o.id, o.total, c.name HAVING sum(o.total) > 100 \
    ORDER BY o.total DESC LIMIT 50";

const INJECTED_QUERY: &str = "SELECT id FROM orders WHERE id = 7 OR 1 = 1 \
    UNION SELECT @@version";

fn policy() -> PolicyConfig {
    PolicyConfig {
        table_check_enabled: true,
        permitted_tables: ["orders", "customers"]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        ..PolicyConfig::default()
    }
}

fn bench_check(c: &mut Criterion) {
    let firewall = Firewall::new(policy(), Dialect::MySql);

    c.bench_function("check_report_query", |b| {
        b.iter(|| firewall.check(std::hint::black_box(REPORT_QUERY)))
    });
    c.bench_function("check_injected_query", |b| {
        b.iter(|| firewall.check(std::hint::black_box(INJECTED_QUERY)))
    });

    let batch: Vec<String> = (0..1000)
        .map(|i| format!("SELECT id, total FROM orders WHERE id = {i} AND status = 'open'"))
        .collect();
    c.bench_function("check_batch_1000", |b| {
        b.iter(|| firewall.check_batch(std::hint::black_box(&batch)))
    });
}

criterion_group!(benches, bench_check);
criterion_main!(benches);
