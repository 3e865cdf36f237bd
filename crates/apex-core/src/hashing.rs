// apex-core/src/hashing.rs
// ============================================================================
// Module: Canonical Hashing
// Description: Deterministic fingerprints for loaded configs and reports.
// Purpose: Back the reload round-trip property ("reloading the same config
//          twice yields structurally equal ConfigHandles") with a concrete,
//          comparable digest.
// Dependencies: serde_jcs, sha2
// ============================================================================

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

/// Errors raised while canonicalizing a value for hashing.
#[derive(Debug, Error)]
pub enum HashingError {
    /// The value could not be serialized into JSON Canonicalization Scheme
    /// form, e.g. it contains a non-finite float.
    #[error("failed to canonicalize value for hashing: {0}")]
    Canonicalize(String),
}

/// Hashes any serializable value after canonicalizing it per RFC 8785 (JSON
/// Canonicalization Scheme), so that structurally equal values always
/// produce the same digest regardless of field order.
///
/// # Errors
/// Returns `HashingError::Canonicalize` if canonicalization fails.
pub fn hash_canonical_json<T: Serialize>(value: &T) -> Result<String, HashingError> {
    let canonical =
        serde_jcs::to_string(value).map_err(|err| HashingError::Canonicalize(err.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::hash_canonical_json;

    #[test]
    fn field_order_does_not_affect_the_digest() {
        let a = serde_json::json!({ "name": "widgets", "version": "1.0.0" });
        let b = serde_json::json!({ "version": "1.0.0", "name": "widgets" });
        assert_eq!(hash_canonical_json(&a).expect("hash"), hash_canonical_json(&b).expect("hash"));
    }

    #[test]
    fn different_values_hash_differently() {
        let a = serde_json::json!({ "name": "widgets" });
        let b = serde_json::json!({ "name": "gadgets" });
        assert_ne!(hash_canonical_json(&a).expect("hash"), hash_canonical_json(&b).expect("hash"));
    }
}
