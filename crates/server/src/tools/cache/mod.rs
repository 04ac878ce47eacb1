//! Cache control MCP tools.
//!
//! These go through the edge control channel rather than touching the
//! stores directly.

pub mod adopt;
pub mod clear;
pub mod info;

pub use adopt::adopt_impl;
pub use clear::clear_impl;
pub use info::info_impl;
