//! Performance benchmarks for the request hot path.
//!
//! Run with: `cargo bench --bench assignment`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Bucket hash | <1µs | Per visitor/experiment pair |
//! | Variant assignment | <1µs | Up to 10 arms |
//! | Content resolution | <50µs | 50 blocks, half references |
//! | Full lookup | <200µs | In-memory store |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;

use page_experiment_kernel::types::ReusableCategory;
use page_experiment_kernel::{
    assign_variant, resolve_content, visitor_bucket, Block, BlockSettings, Experiment,
    ExperimentResolver, ExperimentStatus, ExperimentVariantEntry, InMemoryDocumentStore, Page,
    PageVariant, Relation, ReusableBlockDocument, VariantAllocation,
};

/// An even split across `arms` variants.
fn allocations(arms: u32) -> Vec<VariantAllocation> {
    let share = 100 / arms;
    (0..arms)
        .map(|i| {
            let pct = if i == arms - 1 { 100 - share * (arms - 1) } else { share };
            VariantAllocation::new(format!("v{}", i), pct)
        })
        .collect()
}

/// A block list where every other block references a populated reusable block.
fn mixed_blocks(count: usize) -> Vec<Block> {
    (0..count)
        .map(|i| {
            if i % 2 == 0 {
                Block::content(json!({ "text": format!("inline {}", i) }), BlockSettings::default())
            } else {
                let shared = ReusableBlockDocument::new(
                    format!("R{}", i),
                    "Shared",
                    ReusableCategory::Content,
                    Some(Block::content(json!({ "text": "shared" }), BlockSettings::default())),
                );
                Block::reference(
                    Relation::Populated(Box::new(shared)),
                    BlockSettings::with_block_id(format!("placement{}", i)),
                )
            }
        })
        .collect()
}

fn bench_bucket_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_hash");
    group.throughput(Throughput::Elements(1));
    group.bench_function("visitor_bucket", |b| {
        b.iter(|| visitor_bucket(black_box("V1StGXR8_Z5jdHi6B-myT"), black_box("6650f1c2a9e4b3d2c1a0f9e8")))
    });
    group.finish();
}

fn bench_assignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign_variant");

    for arms in [2, 4, 10] {
        let allocs = allocations(arms);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("arms", arms), &allocs, |b, allocs| {
            b.iter(|| assign_variant(black_box("visitor_abc"), black_box("exp_123"), allocs))
        });
    }

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_content");

    for count in [5, 20, 50] {
        let blocks = mixed_blocks(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("blocks", count), &blocks, |b, blocks| {
            b.iter(|| resolve_content(black_box(blocks)))
        });
    }

    group.finish();
}

fn bench_full_lookup(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");

    let mut store = InMemoryDocumentStore::new();
    let mut page = Page::new("p1", "landing", "Landing");
    page.content = mixed_blocks(20)
        .into_iter()
        .map(|block| match block {
            Block::ReusableBlockRef(mut r) => {
                r.block = Relation::Id(r.block.id().clone());
                Block::ReusableBlockRef(r)
            }
            other => other,
        })
        .collect();
    for i in (1..20).step_by(2) {
        store.insert_reusable_block(ReusableBlockDocument::new(
            format!("R{}", i),
            "Shared",
            ReusableCategory::Content,
            Some(Block::content(json!({ "text": "shared" }), BlockSettings::default())),
        ));
    }
    store.insert_page(page).unwrap();
    store.insert_variant(PageVariant::new("vA", "A", "p1"));
    store.insert_variant(PageVariant::new("vB", "B", "p1"));
    store
        .insert_experiment(Experiment::new(
            "e1",
            "Landing test",
            "p1",
            ExperimentStatus::Running,
            vec![ExperimentVariantEntry::new("vA", 50), ExperimentVariantEntry::new("vB", 50)],
        ))
        .unwrap();

    let resolver = ExperimentResolver::new(Arc::new(store));
    let visitors: Vec<String> = (0..1000).map(|i| format!("visitor_{}", i)).collect();

    let mut group = c.benchmark_group("assigned_variant");
    group.throughput(Throughput::Elements(1));
    group.bench_function("in_memory", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % visitors.len();
            let assigned = runtime
                .block_on(resolver.assigned_variant("landing", &visitors[i]))
                .unwrap();
            assert!(assigned.is_some());
            assigned
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_bucket_hash,
    bench_assignment,
    bench_resolution,
    bench_full_lookup,
);

criterion_main!(benches);
