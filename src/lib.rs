//! # page-experiment-kernel
//!
//! Deterministic variant assignment and block resolution for CMS page experiments.
//!
//! The kernel answers one question:
//!
//! > Given a page slug and a visitor, **which page content should this visitor see**?
//!
//! ## Core Contract
//!
//! 1. A visitor is hashed into one of 100 buckets per experiment, stably
//! 2. The bucket is walked through the experiment's traffic split to pick a variant
//! 3. Reusable-block references on the page are inlined
//! 4. The variant's section overrides replace (never merge with) the base sections
//!
//! ## Architecture
//!
//! ```text
//! slug + visitor → ExperimentResolver → assign_variant → resolve_page → compose
//!                         ↓
//!                 DocumentStore (Postgres or Memory)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same visitor + same experiment → same bucket, on every call and every host
//! - Same bucket + same traffic split → same variant
//! - Resolution is idempotent on content without references

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod assignment;
pub mod resolve;
pub mod hooks;
pub mod registry;
pub mod visitor;
pub mod canonical;
pub mod store;
pub mod lookup;
pub mod stats;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{
    Block, BlockSettings, BlockType, Document, DocumentId, Relation, ResolvedBlock, Section,
    Page, PageVariant, ReusableBlockDocument, ResolvedPage, ResolvedPageWithVariant, VariantMeta,
    Experiment, ExperimentStatus, ExperimentVariantEntry, AnalyticsEvent, EventType, Lead,
};
pub use assignment::{
    assign_variant, hash_to_bucket, visitor_bucket, Assignment, AssignmentError, VariantAllocation,
    BUCKET_COUNT,
};
pub use resolve::{compose, resolve_blocks, resolve_content, resolve_page};
pub use hooks::{
    ensure_block_ids, generate_block_id, validate_experiment, validate_page_sections, ExperimentValidationError,
    SectionError,
};
pub use registry::{
    allowed_blocks, generate_catalog, check_drift, BlockCatalog, BlockRegistryEntry, CatalogDrift,
    BLOCK_REGISTRY,
};
pub use visitor::{visitor_from_cookie_header, visitor_set_cookie, VisitorIdResult};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use store::{DocumentStore, ExperimentFilter, InMemoryDocumentStore};
#[cfg(feature = "postgres")]
pub use store::PostgresDocumentStore;
pub use lookup::{
    AssignedVariant, ExperimentResolver, LookupError, MultipleRunningPolicy, PreviewOutcome,
    ResolverConfig,
};
pub use stats::{aggregate, ExperimentStats, StatsAggregator, VariantMetrics};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceConfig, ServiceState};
