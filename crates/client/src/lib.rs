//! Client code for slidecache.
//!
//! This crate provides the network fetch seam shared by both tiers and the
//! in-page resource manager that sits on top of it.

pub mod fetch;
pub mod resources;

pub use fetch::{FetchClient, FetchConfig, Fetcher, UrlError, canonicalize};

pub use resources::{AssetKind, AssetRef, ResourceManager, ResourceManagerConfig, SlideDeck};
