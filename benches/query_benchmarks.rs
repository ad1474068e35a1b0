// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for query planning and execution

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use moniq_exec::{InMemorySource, Query};
use moniq_model::{EnumKind, ObjectKind, Property, Record, Value};
use moniq_planner::{normalize, to_dnf, Captures, Expr, PagingHints, Planner, Predicate};

fn s() -> Expr {
    Expr::param("s")
}

/// `s.Name == "n0" || s.Name == "n1" || ...`
fn name_disjunction(width: usize) -> Predicate {
    let body = Expr::disjunction((0..width).map(|i| s().prop(Property::Name).eq(format!("n{i}"))));
    Predicate::new("s", body)
}

/// `(a0 || b0) && (a1 || b1) && ...`, which expands to `2^pairs` branches.
fn product_of_sums(pairs: usize) -> Expr {
    Expr::conjunction((0..pairs).map(|i| {
        s().prop(Property::Id)
            .eq(i as i64)
            .or(s().prop(Property::Name).contains(format!("p{i}")))
    }))
}

fn sensors(count: i64) -> Vec<Record> {
    let states = ["Up", "Down", "Warning"];
    (0..count)
        .map(|id| {
            let state = states[(id % 3) as usize];
            Record::new(ObjectKind::Sensor, id)
                .with(Property::Name, format!("sensor-{id}"))
                .with(
                    Property::Status,
                    Value::Enum(EnumKind::Status.from_name(state).unwrap()),
                )
                .with(Property::Active, id % 2 == 0)
        })
        .collect()
}

// ============================================================================
// Planning Benchmarks
// ============================================================================

fn bench_plan_disjunction(c: &mut Criterion) {
    let planner = Planner::default();
    let captures = Captures::new();
    let mut group = c.benchmark_group("plan");

    for width in [2usize, 8, 32].iter() {
        let predicate = name_disjunction(*width);
        group.bench_with_input(BenchmarkId::new("disjunction", width), width, |b, _| {
            b.iter(|| {
                black_box(
                    planner
                        .plan(
                            ObjectKind::Sensor,
                            &predicate,
                            &captures,
                            PagingHints::default(),
                        )
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

fn bench_dnf_expansion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dnf");

    for pairs in [2usize, 4, 6].iter() {
        let expr = normalize(product_of_sums(*pairs));
        group.throughput(Throughput::Elements(1 << *pairs));
        group.bench_with_input(BenchmarkId::new("expand", pairs), pairs, |b, _| {
            b.iter(|| black_box(to_dnf(&expr, 1 << 10).unwrap()));
        });
    }

    group.finish();
}

// ============================================================================
// Execution Benchmarks
// ============================================================================

fn bench_execute(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let source = Arc::new(InMemorySource::with_records(sensors(10_000)));
    let mut group = c.benchmark_group("execute");
    group.throughput(Throughput::Elements(10_000));

    let remote_only = Query::new(source.clone(), ObjectKind::Sensor).filter(Predicate::build(
        "s",
        |s| {
            s.clone()
                .prop(Property::Status)
                .eq(Expr::status("Down"))
                .and(s.prop(Property::Active))
        },
    ));
    group.bench_function("single_branch", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(remote_only.execute().await.unwrap()) });
    });

    let merged = Query::new(source.clone(), ObjectKind::Sensor).filter(Predicate::build(
        "s",
        |s| {
            s.clone()
                .prop(Property::Status)
                .eq(Expr::status("Down"))
                .or(s.prop(Property::Name).contains("-99"))
        },
    ));
    group.bench_function("two_branches_with_residual", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(merged.execute().await.unwrap()) });
    });

    group.finish();
}

criterion_group!(
    planning_benches,
    bench_plan_disjunction,
    bench_dnf_expansion
);

criterion_group!(
    execution_benches,
    bench_execute
);

criterion_main!(
    planning_benches,
    execution_benches
);
