//! Retrieval strategies for cacheable requests.
//!
//! Each strategy combines the origin fetcher, the current cache generation and
//! the freshness metadata to produce one response:
//!
//! - [`network_first`](Strategies::network_first): origin, then cache on failure
//! - [`cache_first`](Strategies::cache_first): cache, then origin on miss
//! - [`time_aware_cache_first`](Strategies::time_aware_cache_first): cache while
//!   fresh, origin when stale, stale cache if the origin fails
//! - [`stale_while_revalidate`](Strategies::stale_while_revalidate): cache at
//!   once, refresh stale entries in the background
//!
//! Cache store problems never fail a request on their own: a failed lookup is
//! treated as a miss and a failed write is logged. Only a fetch failure with
//! nothing to fall back on reaches the caller.

mod cache_first;
mod network_first;
mod stale_while_revalidate;
mod time_aware;

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use url::Url;

use crate::cache::Generation;
use crate::classify::{RequestDescriptor, StrategyKind};
use crate::fetch::{FetchOptions, OriginFetcher};
use crate::metadata::MetadataStore;
use crate::{Error, Response};

/// Where the response handed back to the caller came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Fetched from the origin by a strategy.
    Network,
    /// Served from the cache generation.
    Cache,
    /// Not intercepted; fetched from the origin untouched.
    Passthrough,
}

/// Result of running a strategy.
#[derive(Debug)]
pub struct StrategyOutcome {
    pub response: Response,
    pub source: ResponseSource,
    /// Background refresh scheduled by stale-while-revalidate, if any.
    pub revalidation: Option<JoinHandle<()>>,
}

impl StrategyOutcome {
    pub(crate) fn network(response: Response) -> Self {
        Self { response, source: ResponseSource::Network, revalidation: None }
    }

    pub(crate) fn cache(response: Response) -> Self {
        Self { response, source: ResponseSource::Cache, revalidation: None }
    }

    pub(crate) fn passthrough(response: Response) -> Self {
        Self { response, source: ResponseSource::Passthrough, revalidation: None }
    }
}

/// Strategy runner bound to one generation, its metadata and a fetcher.
///
/// Cheap to clone; background revalidation tasks own a clone.
#[derive(Clone)]
pub struct Strategies {
    generation: Generation,
    metadata: MetadataStore,
    fetcher: Arc<dyn OriginFetcher>,
    origin: Url,
    max_age_ms: i64,
}

impl fmt::Debug for Strategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategies")
            .field("generation", &self.generation.name())
            .field("origin", &self.origin.as_str())
            .field("max_age_ms", &self.max_age_ms)
            .finish()
    }
}

impl Strategies {
    pub fn new(
        generation: Generation, metadata: MetadataStore, fetcher: Arc<dyn OriginFetcher>, origin: Url, max_age_ms: i64,
    ) -> Self {
        Self { generation, metadata, fetcher, origin, max_age_ms }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn max_age_ms(&self) -> i64 {
        self.max_age_ms
    }

    /// Run the strategy `kind` for `request`.
    pub async fn run(&self, kind: StrategyKind, request: &RequestDescriptor) -> Result<StrategyOutcome, Error> {
        tracing::debug!(strategy = %kind, url = %request.url(), "running cache strategy");
        match kind {
            StrategyKind::NetworkFirst => self.network_first(request).await,
            StrategyKind::CacheFirst => self.cache_first(request).await,
            StrategyKind::TimeAwareCacheFirst => self.time_aware_cache_first(request).await,
            StrategyKind::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    /// Fetch from the origin with options derived from the serving origin.
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Response, Error> {
        let options = FetchOptions::for_request(request, &self.origin);
        self.fetcher.fetch(request, &options).await
    }

    /// Cache lookup where a store error counts as a miss.
    async fn lookup(&self, request: &RequestDescriptor) -> Option<Response> {
        match self.generation.lookup(&request.cache_key()).await {
            Ok(found) => {
                tracing::debug!(url = %request.url(), hit = found.is_some(), "cache lookup");
                found
            }
            Err(e) => {
                tracing::warn!(url = %request.url(), error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Staleness check where a metadata error counts as stale.
    async fn is_stale(&self, request: &RequestDescriptor) -> bool {
        match self.metadata.is_stale(request.url().as_str(), self.max_age_ms).await {
            Ok(stale) => stale,
            Err(e) => {
                tracing::warn!(url = %request.url(), error = %e, "metadata read failed, treating as stale");
                true
            }
        }
    }

    /// Write a response to the cache, optionally recording its refresh time.
    async fn store(&self, request: &RequestDescriptor, response: &Response, touch: bool) {
        if let Err(e) = self.generation.put(&request.cache_key(), response).await {
            tracing::warn!(url = %request.url(), error = %e, "failed to store response in cache");
            return;
        }
        if touch && let Err(e) = self.metadata.touch(request.url().as_str()).await {
            tracing::warn!(url = %request.url(), error = %e, "failed to update cache timestamp");
        }
    }
}
