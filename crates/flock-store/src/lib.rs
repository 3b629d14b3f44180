//! # flock-store
//!
//! Durable local caches for the Flock client, backed by SQLite.
//!
//! These are small, non-authoritative caches: UI preferences (map type,
//! pinned flock order, deleted DM ids, last known geolocation) and the venue
//! search cache with its 5-minute TTL. Nothing here is a source of truth;
//! the server and the in-memory engine always win.

pub mod database;
pub mod migrations;
pub mod prefs;
pub mod search_cache;

mod error;

pub use database::Database;
pub use error::StoreError;
