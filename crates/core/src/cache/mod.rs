//! SQLite-backed cache store, scoped by named generations.
//!
//! This module provides the persistent byte-response cache the engine is
//! layered on, using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named generations (one per deployed worker version)
//! - Request entries keyed by SHA-256 of method + URL
//! - Reserved keys for engine bookkeeping (the metadata mapping)
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use store::{CacheKey, CacheStore, Generation};
