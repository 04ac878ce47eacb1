//! SQLite-backed store partitions for the edge tier.
//!
//! This module provides the persistent side of the cache layer using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named stores with a creation-ordered catalogue
//! - Request-identity keys using SHA-256 hashing
//! - Explicit insertion-order index for FIFO eviction
//! - A small durable key/value table
//! - Automatic schema migrations

pub mod connection;
pub mod hash;
pub mod kv;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use kv::{GENERATION_KEY, IMAGE_SNAPSHOT_KEY};
pub use stores::{StoreKind, is_generation};
