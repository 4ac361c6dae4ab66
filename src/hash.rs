//! Content hashing for files and whole projects
//!
//! File hashes are the first 16 hex chars of an xxh3 digest over the
//! file bytes. The project hash digests the sorted `path:hash` pairs,
//! so discovery order never changes it.

use std::collections::BTreeMap;

/// Hash a file's byte content to a 16-hex-char FileHash
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:016x}", xxhash_rust::xxh3::xxh3_64(bytes))
}

/// Hash the per-file hashes of a project to a 16-hex-char ProjectHash
///
/// Entries are concatenated as `<relpath>:<hash>` joined by `|` in
/// ascending path order (the BTreeMap iteration order).
pub fn hash_project(file_hashes: &BTreeMap<String, String>) -> String {
    let joined = file_hashes
        .iter()
        .map(|(path, hash)| format!("{}:{}", path, hash))
        .collect::<Vec<_>>()
        .join("|");
    hash_bytes(joined.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes_deterministic() {
        let a = hash_bytes(b"export function add() {}");
        let b = hash_bytes(b"export function add() {}");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_bytes_distinct() {
        assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
    }

    #[test]
    fn test_project_hash_order_invariant() {
        let mut forward = BTreeMap::new();
        forward.insert("a.ts".to_string(), hash_bytes(b"a"));
        forward.insert("b.ts".to_string(), hash_bytes(b"b"));

        // Insert in the opposite order; BTreeMap sorts either way
        let mut backward = BTreeMap::new();
        backward.insert("b.ts".to_string(), hash_bytes(b"b"));
        backward.insert("a.ts".to_string(), hash_bytes(b"a"));

        assert_eq!(hash_project(&forward), hash_project(&backward));
    }

    #[test]
    fn test_project_hash_empty() {
        assert_eq!(hash_project(&BTreeMap::new()), hash_bytes(b""));
    }

    #[test]
    fn test_project_hash_changes_with_content() {
        let mut one = BTreeMap::new();
        one.insert("a.ts".to_string(), hash_bytes(b"v1"));
        let mut two = BTreeMap::new();
        two.insert("a.ts".to_string(), hash_bytes(b"v2"));
        assert_ne!(hash_project(&one), hash_project(&two));
    }
}
