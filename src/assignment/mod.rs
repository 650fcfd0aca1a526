//! Deterministic visitor-to-variant assignment.
//!
//! Assignment is a pure function of `(visitor_id, experiment_id, allocations)`:
//! there is no stored assignment table and no counter, so concurrent requests
//! for the same visitor always agree.

pub mod bucket;
pub mod traffic;

pub use bucket::{hash_to_bucket, assignment_key, visitor_bucket, BUCKET_COUNT};
pub use traffic::{assign_variant, pick_for_bucket, Assignment, AssignmentError, VariantAllocation};
