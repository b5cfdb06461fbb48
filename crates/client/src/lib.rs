//! Client code for swcache.
//!
//! This crate provides the reqwest-backed origin fetcher the cache engine
//! uses for all network retrieval, plus URL canonicalization.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, canonicalize};
