//! Core engine for swcache, an intercepting HTTP cache.
//!
//! This crate provides:
//! - Cache store with SQLite backend, scoped by named generations
//! - Per-URL freshness metadata stored inside each generation
//! - Request classification and the four retrieval strategies
//! - The worker lifecycle (install, activate, fetch hook, control messages)
//! - Unified error types and layered configuration

pub mod cache;
pub mod classify;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod lifecycle;
pub mod metadata;
pub mod response;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheDb, CacheKey, CacheStore, Generation};
pub use classify::{CachePolicy, Classifier, Decision, PolicyPreset, RequestDescriptor, StrategyKind};
pub use clock::{Clock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use fetch::{CredentialsPolicy, FetchOptions, OriginFetcher, RequestMode};
pub use lifecycle::{CacheWorker, ControlCommand, ControlReply, LifecycleState, WorkerSettings, WorkerStatus};
pub use metadata::MetadataStore;
pub use response::Response;
pub use strategy::{ResponseSource, Strategies, StrategyOutcome};
