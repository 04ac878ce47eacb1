//! MCP tool implementations.
//!
//! This module contains all tools exposed by the slidecache server.

pub mod cache;
pub mod resource_fetch;
pub mod resource_load;
pub mod slide_navigate;

pub use resource_fetch::{ResourceFetchParams, fetch_impl};
pub use resource_load::{ResourceLoadParams, load_impl};
pub use slide_navigate::{SlideNavigateParams, navigate_impl, stats_impl};
