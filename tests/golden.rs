//! Golden tests for the experiment kernel.
//!
//! These tests pin down determinism of assignment and the exact shape of
//! resolved content.

use page_experiment_kernel::{
    assign_variant, canonical_hash_hex, generate_catalog, hash_to_bucket, resolve_blocks,
    resolve_content, visitor_bucket, Block, BlockSettings, BlockType, DocumentId, Relation,
    ReusableBlockDocument, VariantAllocation,
};
use page_experiment_kernel::types::ReusableCategory;
use serde_json::json;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn split(a: u32, b: u32) -> Vec<VariantAllocation> {
    vec![VariantAllocation::new("A", a), VariantAllocation::new("B", b)]
}

fn count_assignments(experiment_id: &str, allocations: &[VariantAllocation], visitors: usize) -> (usize, usize) {
    let mut a = 0;
    let mut b = 0;
    for i in 0..visitors {
        let visitor = format!("visitor_{}", i);
        let assignment = assign_variant(&visitor, experiment_id, allocations).unwrap();
        match assignment.variant_id.as_str() {
            "A" => a += 1,
            "B" => b += 1,
            other => panic!("unexpected variant {}", other),
        }
    }
    (a, b)
}

fn shared_block(id: &str, block: Option<Block>) -> Relation<ReusableBlockDocument> {
    Relation::Populated(Box::new(ReusableBlockDocument::new(
        id,
        "Shared",
        ReusableCategory::Content,
        block,
    )))
}

// ─────────────────────────────────────────────────────────────────────────────
// DETERMINISM TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_same_visitor_same_variant_100_runs() {
    let allocations = split(50, 50);
    let first = assign_variant("visitor_abc", "exp_123", &allocations).unwrap();

    for i in 1..100 {
        let again = assign_variant("visitor_abc", "exp_123", &allocations).unwrap();
        assert_eq!(first, again, "Assignment must be deterministic (run {} differs from run 0)", i);
    }

    eprintln!("Deterministic assignment: bucket {} -> {}", first.bucket, first.variant_id);
}

#[test]
fn test_known_bucket_values() {
    assert_eq!(hash_to_bucket("visitor_abc:exp_123"), 10);
    assert_eq!(visitor_bucket("visitor_abc", "exp_123"), 10);
    assert_eq!(visitor_bucket("visitor_30", "exp_123"), 49);
    assert_eq!(visitor_bucket("visitor_183", "exp_123"), 50);
}

#[test]
fn test_bucket_boundary_between_arms() {
    let allocations = split(50, 50);

    // Bucket 49 is the last bucket of A, 50 the first of B
    let low = assign_variant("visitor_30", "exp_123", &allocations).unwrap();
    assert_eq!(low.bucket, 49);
    assert_eq!(low.variant_id, DocumentId::from("A"));

    let high = assign_variant("visitor_183", "exp_123", &allocations).unwrap();
    assert_eq!(high.bucket, 50);
    assert_eq!(high.variant_id, DocumentId::from("B"));
}

#[test]
fn test_experiment_id_changes_bucket_space() {
    let differing = (0..200)
        .map(|i| format!("visitor_{}", i))
        .filter(|v| visitor_bucket(v, "exp_123") != visitor_bucket(v, "exp_456"))
        .count();
    assert!(differing > 100, "only {} of 200 visitors moved between experiments", differing);
}

// ─────────────────────────────────────────────────────────────────────────────
// DISTRIBUTION TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_even_split_over_1000_visitors() {
    let (a, b) = count_assignments("exp_123", &split(50, 50), 1000);
    assert_eq!(a + b, 1000);
    assert!((350..=650).contains(&a), "A got {} of 1000", a);
    assert!((350..=650).contains(&b), "B got {} of 1000", b);
}

#[test]
fn test_70_30_split_favors_majority() {
    let (a, b) = count_assignments("exp_456", &split(70, 30), 100);
    assert!(a > b, "A got {}, B got {}", a, b);
}

// ─────────────────────────────────────────────────────────────────────────────
// RESOLUTION TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_reference_resolves_to_shared_block() {
    let source = Block::content(json!({ "text": "Shared copy" }), BlockSettings::with_block_id("source"));
    let blocks = vec![Block::reference(
        shared_block("R1", Some(source)),
        BlockSettings::with_block_id("abc"),
    )];

    let resolved = resolve_content(&blocks).unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].block_type(), BlockType::Content);
    assert_eq!(resolved[0].resolved_from, Some(DocumentId::from("R1")));
    assert_eq!(resolved[0].settings().block_id.as_deref(), Some("abc"));

    let wire = serde_json::to_value(&resolved[0]).unwrap();
    assert_eq!(wire["blockType"], "contentBlock");
    assert_eq!(wire["_resolvedFrom"], "R1");
    assert_eq!(wire["settings"]["blockId"], "abc");
    assert_eq!(wire["body"]["text"], "Shared copy");
}

#[test]
fn test_empty_shared_block_is_omitted() {
    let blocks = vec![
        Block::content(json!({ "text": "before" }), BlockSettings::default()),
        Block::reference(shared_block("R2", None), BlockSettings::with_block_id("gone")),
        Block::content(json!({ "text": "after" }), BlockSettings::default()),
    ];

    let (resolved, summary) = resolve_blocks(&blocks);
    assert_eq!(resolved.len(), 2);
    assert_eq!(summary.dropped, 1);
}

#[test]
fn test_unpopulated_reference_passes_through() {
    let blocks = vec![Block::reference(Relation::Id(DocumentId::from("R3")), BlockSettings::default())];
    let resolved = resolve_content(&blocks).unwrap();
    assert_eq!(resolved[0].block, blocks[0]);
    assert_eq!(resolved[0].resolved_from, None);
}

#[test]
fn test_resolution_idempotent_without_references() {
    let blocks = vec![
        Block::hero("Welcome", BlockSettings::with_block_id("h1")),
        Block::content(json!({ "text": "body" }), BlockSettings::default()),
        Block::footer("Bye", BlockSettings::default()),
    ];

    let once = resolve_content(&blocks).unwrap();
    let plain: Vec<Block> = once.iter().map(|r| r.block.clone()).collect();
    assert_eq!(plain, blocks);

    let twice = resolve_content(&plain).unwrap();
    assert_eq!(once, twice);
}

// ─────────────────────────────────────────────────────────────────────────────
// CATALOG TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_catalog_lists_every_block_in_slug_order() {
    let catalog = generate_catalog();
    let slugs: Vec<&str> = catalog.blocks.iter().map(|b| b.slug.as_str()).collect();
    assert_eq!(
        slugs,
        vec![
            "accordionBlock",
            "contentBlock",
            "faqBlock",
            "footerBlock",
            "heroBlock",
            "reusableBlockRef",
            "statsBlock",
        ]
    );
}

#[test]
fn test_catalog_fingerprint_ignores_generation_time() {
    let first = generate_catalog();
    let mut second = generate_catalog();
    second.generated_at = first.generated_at + chrono::Duration::days(1);

    assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    assert_eq!(
        first.fingerprint().unwrap(),
        canonical_hash_hex(&first.blocks).unwrap()
    );
}
