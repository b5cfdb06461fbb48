//! Request cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request: SHA-256 over method and URL.
///
/// The method is uppercased so `get` and `GET` address the same entry.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// True if `key` has the shape of a request key (64 lowercase hex chars).
pub fn is_request_key(key: &str) -> bool {
    key.len() == 64 && key.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key("GET", "https://example.com/a.png");
        let hash2 = compute_cache_key("GET", "https://example.com/a.png");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_method_case_folded() {
        assert_eq!(
            compute_cache_key("get", "https://example.com/"),
            compute_cache_key("GET", "https://example.com/")
        );
    }

    #[test]
    fn test_hash_different_method() {
        let get = compute_cache_key("GET", "https://example.com/");
        let head = compute_cache_key("HEAD", "https://example.com/");
        assert_ne!(get, head);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key("GET", "https://example.com");
        assert!(is_request_key(&hash));
        assert!(!is_request_key("ccported-cache-metadata"));
    }
}
