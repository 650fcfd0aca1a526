//! Content resolution pipeline.
//!
//! ```text
//! Page ──resolve_page──▶ ResolvedPage ──compose(variant)──▶ ResolvedPageWithVariant
//! ```
//!
//! Both steps are pure: they never fail on data shape (unpopulated or empty
//! references are valid states) and never modify their inputs.

pub mod blocks;
pub mod variant;

pub use blocks::{resolve_block, resolve_blocks, resolve_content, resolve_page, ResolutionStep, ResolutionSummary};
pub use variant::compose;
