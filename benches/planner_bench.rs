use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use dpc::catalog::{OperationCatalog, OperationDecl, ParamDecl, ReceiverDecl};
use dpc::schema::{MemberDecl, Schema, StateDecl};
use dpc::types::{Primitive, TypeExpr, TypeTable};
use dpc::*;

// Synthetic units: `n_fields` state members, `n_ops` operations, each
// operation consuming a sliding window of four fields so that most fields
// are shared.

fn field_type(i: usize) -> TypeExpr {
    match i % 3 {
        0 => TypeExpr::Primitive(Primitive::Int),
        1 => TypeExpr::declared("java.lang.String"),
        _ => TypeExpr::array_of(TypeExpr::Primitive(Primitive::Double)),
    }
}

fn generate_unit(n_fields: usize, n_ops: usize) -> AnalysisUnit {
    let members = (0..n_fields)
        .map(|i| MemberDecl::new(format!("f{}", i), field_type(i), i % 5 == 1))
        .collect();
    let operations = (0..n_ops)
        .map(|op| {
            let params = (0..4)
                .map(|k| {
                    let i = (op + k) % n_fields;
                    ParamDecl::new(format!("f{}", i), field_type(i), i % 5 == 1)
                })
                .collect();
            OperationDecl::new(format!("render{}", op), params)
        })
        .collect();
    AnalysisUnit::new(
        StateDecl {
            name: "BenchState".to_string(),
            structural_equality: true,
            members,
        },
        ReceiverDecl {
            name: "BenchRenderer".to_string(),
            operations,
        },
    )
}

fn scenarios() -> [(&'static str, AnalysisUnit); 3] {
    [
        ("small", generate_unit(4, 4)),
        ("medium", generate_unit(20, 30)),
        ("large", generate_unit(80, 120)),
    ]
}

// KPI: full analysis latency (canonicalize -> reconcile -> validate -> plan).
fn bench_kpi_analyze_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/analyze_latency");

    for (name, unit) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &unit, |b, unit| {
            b.iter_batched(
                || unit.clone(),
                |unit| {
                    let analysis = analyze(black_box(unit)).expect("benchmark unit must plan");
                    black_box(analysis.plan);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// KPI: reconcile latency; the linear identity scan dominates for wide units.
fn bench_kpi_reconcile_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/reconcile_scaling");

    for n_ops in [10_usize, 50, 200, 800] {
        let unit = generate_unit(n_ops / 2 + 4, n_ops);
        let mut types = TypeTable::new();
        let _schema = Schema::from_decl(&unit.state, &mut types);
        let catalog = OperationCatalog::from_decl(&unit.receiver, &mut types);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}ops", n_ops)),
            &catalog,
            |b, catalog| {
                b.iter(|| {
                    let index = reconcile::reconcile(black_box(catalog));
                    black_box(index);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_kpi_analyze_latency, bench_kpi_reconcile_scaling);
criterion_main!(benches);
