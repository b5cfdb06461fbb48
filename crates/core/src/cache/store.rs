//! The cache store seam and its generation-scoped handle.
//!
//! The engine never talks to SQLite directly: it goes through [`CacheStore`],
//! which keeps an opaque `key -> Response` mapping per named generation.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::hash::compute_cache_key;
use crate::{Error, Response};

/// Key of a cache entry.
///
/// Request keys are derived from method + URL. Reserved keys are plain names
/// used for engine bookkeeping and can never collide with a request key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
    url: String,
    method: Option<String>,
}

impl CacheKey {
    pub fn for_request(method: &str, url: &str) -> Self {
        Self {
            key: compute_cache_key(method, url),
            url: url.to_string(),
            method: Some(method.to_ascii_uppercase()),
        }
    }

    pub fn reserved(name: &str) -> Self {
        Self { key: name.to_string(), url: name.to_string(), method: None }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP method for request keys, None for reserved keys.
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn is_reserved(&self) -> bool {
        self.method.is_none()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "{method} {}", self.url),
            None => write!(f, "<{}>", self.key),
        }
    }
}

/// Persistent keyed response cache, partitioned into named generations.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the generation if it does not exist yet.
    async fn create_generation(&self, generation: &str) -> Result<(), Error>;

    /// Names of all existing generations.
    async fn generations(&self) -> Result<Vec<String>, Error>;

    /// Delete a generation with all of its entries.
    ///
    /// Returns true if the generation existed.
    async fn delete_generation(&self, generation: &str) -> Result<bool, Error>;

    async fn get(&self, generation: &str, key: &CacheKey) -> Result<Option<Response>, Error>;

    /// Insert or replace an entry, creating the generation on demand.
    async fn put(&self, generation: &str, key: &CacheKey, response: &Response) -> Result<(), Error>;

    /// Returns true if the entry existed.
    async fn delete(&self, generation: &str, key: &CacheKey) -> Result<bool, Error>;
}

/// Handle on one named generation of a [`CacheStore`].
///
/// Cheap to clone; clones address the same generation.
#[derive(Clone)]
pub struct Generation {
    store: Arc<dyn CacheStore>,
    name: Arc<str>,
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generation").field("name", &self.name).finish()
    }
}

impl Generation {
    /// Handle on `name` without touching the store.
    pub fn new(store: Arc<dyn CacheStore>, name: &str) -> Self {
        Self { store, name: Arc::from(name) }
    }

    /// Open `name`, creating it in the store if needed.
    pub async fn open(store: Arc<dyn CacheStore>, name: &str) -> Result<Self, Error> {
        store.create_generation(name).await?;
        Ok(Self::new(store, name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Look up an entry. A miss is `Ok(None)`, not an error.
    pub async fn lookup(&self, key: &CacheKey) -> Result<Option<Response>, Error> {
        self.store.get(&self.name, key).await
    }

    pub async fn put(&self, key: &CacheKey, response: &Response) -> Result<(), Error> {
        self.store.put(&self.name, key, response).await
    }

    pub async fn delete(&self, key: &CacheKey) -> Result<bool, Error> {
        self.store.delete(&self.name, key).await
    }

    /// Delete this whole generation, metadata included.
    pub async fn destroy(&self) -> Result<bool, Error> {
        self.store.delete_generation(&self.name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::hash::is_request_key;

    #[test]
    fn test_request_key_shape() {
        let key = CacheKey::for_request("get", "https://example.com/a.js");
        assert!(is_request_key(key.as_str()));
        assert_eq!(key.method(), Some("GET"));
        assert_eq!(key.url(), "https://example.com/a.js");
        assert!(!key.is_reserved());
        assert_eq!(key.to_string(), "GET https://example.com/a.js");
    }

    #[test]
    fn test_reserved_key_never_collides() {
        let reserved = CacheKey::reserved("ccported-cache-metadata");
        assert!(reserved.is_reserved());
        assert!(!is_request_key(reserved.as_str()));
        assert_ne!(reserved, CacheKey::for_request("GET", "ccported-cache-metadata"));
    }
}
