use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

/// Identity under which requests coalesce and results are cached.
///
/// A key is the operation type name followed by an individualized part:
/// `"<OperationTypeName> <individualized-part>"`. The individualized part
/// must be normalized before composition so that two logically identical
/// requests always derive byte-identical keys: identifier sets are joined in
/// sorted order and variable-size request bodies are content-hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Composes a key from an operation type name and its individualized part.
    ///
    /// The type-name prefix keeps identical individualized parts from
    /// colliding across operation types.
    pub fn new(operation: &str, individualized: impl AsRef<str>) -> Self {
        Self(format!("{} {}", operation, individualized.as_ref()))
    }

    /// Returns the string form of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Joins an identifier set into a deterministic individualized part.
///
/// A [`BTreeSet`] iterates in sorted order, so any two sets with the same
/// contents produce the same string regardless of insertion order.
pub fn joined_identifiers(identifiers: &BTreeSet<String>) -> String {
    identifiers
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Hashes arbitrary request bytes into a fixed-width hex digest.
///
/// Used for individualized parts that would otherwise be unbounded in size,
/// such as receipt post bodies.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_composition_is_deterministic() {
        let a = CacheKey::new("GetCustomerInfo", "user-1");
        let b = CacheKey::new("GetCustomerInfo", "user-1");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "GetCustomerInfo user-1");
    }

    #[test]
    fn test_operation_prefix_prevents_cross_type_collisions() {
        let a = CacheKey::new("GetCustomerInfo", "user-1");
        let b = CacheKey::new("GetOfferings", "user-1");
        assert_ne!(a, b);
    }

    #[test]
    fn test_joined_identifiers_is_order_independent() {
        let forward: BTreeSet<String> =
            ["monthly", "annual", "lifetime"].map(String::from).into();
        let reverse: BTreeSet<String> =
            ["lifetime", "annual", "monthly"].map(String::from).into();
        assert_eq!(joined_identifiers(&forward), joined_identifiers(&reverse));
        assert_eq!(joined_identifiers(&forward), "annual,lifetime,monthly");
    }

    #[test]
    fn test_content_hash_is_stable_and_fixed_width() {
        let a = content_hash(b"receipt bytes");
        let b = content_hash(b"receipt bytes");
        let c = content_hash(b"other receipt bytes");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
