//! Canonical serialization for fingerprinting generated artifacts.
//!
//! Used to compare the block catalog against a previously written copy
//! without being sensitive to whitespace or the generation timestamp.
//!
//! ## Determinism Guarantees
//!
//! - Struct fields serialize in declaration order
//! - Vectors serialize in index order
//! - Maps must be `BTreeMap` (or `serde_json::Value`, which is key-sorted)

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to compact JSON bytes.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

/// Compute the xxh64 fingerprint of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<u64, serde_json::Error> {
    let bytes = to_canonical_bytes(value)?;
    Ok(xxh64(&bytes, 0))
}

/// Fingerprint as a 16-char lowercase hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(format!("{:016x}", canonical_hash(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Field {
        name: String,
        required: bool,
    }

    #[test]
    fn test_determinism() {
        let f = Field {
            name: "headline".to_string(),
            required: true,
        };
        assert_eq!(canonical_hash(&f).unwrap(), canonical_hash(&f).unwrap());
        assert_eq!(canonical_hash_hex(&f).unwrap().len(), 16);
    }

    #[test]
    fn test_value_key_order_is_irrelevant() {
        let a: serde_json::Value = serde_json::from_str(r#"{"b":1,"a":2}"#).unwrap();
        let b = json!({ "a": 2, "b": 1 });
        assert_eq!(canonical_hash(&a).unwrap(), canonical_hash(&b).unwrap());
    }
}
