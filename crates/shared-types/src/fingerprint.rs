//! Content and identity fingerprints

use sha2::{Digest, Sha256};

use crate::types::Category;

/// Compute SHA-256 hash of document bytes
pub fn hash_document(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Stable identity of a violation across a report and a later fix request.
///
/// Fields are NUL-separated so that shifting characters between adjacent
/// fields can never produce the same digest.
pub fn violation_fingerprint(
    document_id: &str,
    category: Category,
    raw_text: &str,
    line: usize,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(category.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(raw_text.as_bytes());
    hasher.update([0u8]);
    hasher.update(line.to_string().as_bytes());
    hex::encode(hasher.finalize())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: Document hash function is deterministic
        #[test]
        fn hash_document_deterministic(data in prop::collection::vec(any::<u8>(), 0..1024)) {
            let hash1 = hash_document(&data);
            let hash2 = hash_document(&data);
            prop_assert_eq!(&hash1, &hash2);
            prop_assert_eq!(hash1.len(), 64);
        }

        /// Property: Violation fingerprints are stable across calls
        #[test]
        fn violation_fingerprint_deterministic(
            id in "[a-z/]{1,20}\\.css",
            raw in "#[0-9a-f]{6}",
            line in 1usize..10_000,
        ) {
            let first = violation_fingerprint(&id, Category::HardcodedColor, &raw, line);
            let second = violation_fingerprint(&id, Category::HardcodedColor, &raw, line);
            prop_assert_eq!(first, second);
        }
    }
}
