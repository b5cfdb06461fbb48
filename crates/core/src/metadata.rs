//! Per-URL freshness timestamps, persisted inside the cache generation.
//!
//! The whole `url -> last refresh (epoch ms)` mapping is one JSON document
//! stored under a reserved key. Every update is a full read, a change to one
//! key, and a full write. Two concurrent updates can therefore race and the
//! later write drops the other's key. Staleness only decides when to go back
//! to the network, so a lost timestamp costs one extra fetch and nothing more.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::{CacheKey, Generation};
use crate::clock::Clock;
use crate::{Error, Response};

/// Seven days in milliseconds.
pub const DEFAULT_MAX_AGE_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// `url -> last refresh timestamp` in epoch milliseconds.
pub type Timestamps = BTreeMap<String, i64>;

/// Freshness store for one cache generation.
#[derive(Clone)]
pub struct MetadataStore {
    generation: Generation,
    key: CacheKey,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("generation", &self.generation.name())
            .field("key", &self.key.as_str())
            .finish()
    }
}

impl MetadataStore {
    pub fn new(generation: Generation, reserved_key: &str, clock: Arc<dyn Clock>) -> Self {
        Self { generation, key: CacheKey::reserved(reserved_key), clock }
    }

    /// The reserved key the mapping lives under.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Read the full mapping.
    ///
    /// A missing entry is an empty mapping. So is a corrupt one: it is logged
    /// and replaced on the next write.
    pub async fn get(&self) -> Result<Timestamps, Error> {
        let Some(stored) = self.generation.lookup(&self.key).await? else {
            return Ok(Timestamps::new());
        };

        match serde_json::from_slice::<Timestamps>(&stored.body) {
            Ok(timestamps) => Ok(timestamps),
            Err(e) => {
                tracing::warn!(
                    generation = self.generation.name(),
                    error = %e,
                    "cache metadata is corrupt, treating as empty"
                );
                Ok(Timestamps::new())
            }
        }
    }

    async fn save(&self, timestamps: &Timestamps) -> Result<(), Error> {
        let body = serde_json::to_vec(timestamps)?;
        let response =
            Response::new(self.key.url(), 200, body).with_header("content-type", "application/json");
        self.generation.put(&self.key, &response).await
    }

    /// Record `url` as refreshed now.
    pub async fn touch(&self, url: &str) -> Result<(), Error> {
        self.touch_all([url]).await
    }

    /// Record several URLs as refreshed now, in one read-modify-write.
    pub async fn touch_all<'a>(&self, urls: impl IntoIterator<Item = &'a str>) -> Result<(), Error> {
        let mut timestamps = self.get().await?;
        let now = self.clock.now_ms();
        for url in urls {
            timestamps.insert(url.to_string(), now);
        }
        self.save(&timestamps).await
    }

    pub async fn timestamp(&self, url: &str) -> Result<Option<i64>, Error> {
        Ok(self.get().await?.get(url).copied())
    }

    /// True if `url` has no timestamp or it is older than `max_age_ms`.
    pub async fn is_stale(&self, url: &str, max_age_ms: i64) -> Result<bool, Error> {
        let stale = match self.timestamp(url).await? {
            Some(ts) => self.clock.now_ms() - ts > max_age_ms,
            None => true,
        };
        Ok(stale)
    }

    /// Reset every recorded timestamp to the epoch so the next staleness
    /// check on any known URL is true. Returns how many URLs were reset.
    pub async fn mark_all_stale(&self) -> Result<usize, Error> {
        let mut timestamps = self.get().await?;
        let reserved = self.key.as_str();
        let mut count = 0;
        for (url, ts) in timestamps.iter_mut() {
            if url != reserved {
                *ts = 0;
                count += 1;
            }
        }
        self.save(&timestamps).await?;
        Ok(count)
    }
}
