//! Core types and shared functionality for slidecache.
//!
//! This crate provides:
//! - Store partitions with SQLite backend
//! - Resource classification and the strategy table
//! - Request/response values shared by both tiers
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod resource;

pub use cache::{CacheDb, StoreKind};
pub use classify::{ResourceKind, Strategy, classify};
pub use config::AppConfig;
pub use error::Error;
pub use resource::{RequestMode, ResourceRequest, ResourceResponse};
