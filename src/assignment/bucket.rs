//! Deterministic hash bucketing.
//!
//! Bucketing must give the same answer for the same input in every process,
//! on every platform, forever: no seeds, no randomized hashers. The hash walks
//! UTF-16 code units so ids containing non-ASCII characters land in the same
//! bucket as they do in browser-side tooling that uses `charCodeAt`.

/// Number of buckets. Buckets are integers in `[0, BUCKET_COUNT)`.
pub const BUCKET_COUNT: u32 = 100;

/// Multiplier of the rolling hash.
const HASH_PRIME: u32 = 31;

/// Hash an arbitrary string into a bucket in `[0, 100)`.
///
/// `hash = (hash * 31 + code_unit * (position + 1)) mod 2^32`. Weighting by
/// position keeps anagrams ("ab" / "ba") apart.
pub fn hash_to_bucket(input: &str) -> u32 {
    let hash = input
        .encode_utf16()
        .enumerate()
        .fold(0u32, |hash, (i, unit)| {
            hash.wrapping_mul(HASH_PRIME)
                .wrapping_add(u32::from(unit).wrapping_mul(i as u32 + 1))
        });
    hash % BUCKET_COUNT
}

/// The string hashed for a visitor/experiment pair.
pub fn assignment_key(visitor_id: &str, experiment_id: &str) -> String {
    format!("{}:{}", visitor_id, experiment_id)
}

/// Bucket of a visitor within an experiment.
pub fn visitor_bucket(visitor_id: &str, experiment_id: &str) -> u32 {
    hash_to_bucket(&assignment_key(visitor_id, experiment_id))
}
