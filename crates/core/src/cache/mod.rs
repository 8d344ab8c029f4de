//! SQLite-backed named cache stores.
//!
//! This module provides persistent, versioned cache stores using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Any number of named stores, each a key-value map from request identity
//!   to a stored response
//! - Atomic single-key put/match, last write wins
//! - Wholesale eviction by deleting a store
//! - The version each worker script last installed
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod registrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{EntrySummary, StoredEntry};
pub use hash::RequestKey;
pub use registrations::InstalledVersion;
