//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting the worker's stores and
//! removing single entries from them.

pub mod delete;
pub mod get;
pub mod keys;

pub use delete::{CacheDeleteParams, delete_impl};
pub use get::{CacheMatchParams, match_impl};
pub use keys::{CacheKeysParams, keys_impl};
