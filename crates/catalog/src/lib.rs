//! Durable media catalog.
//!
//! The catalog is the persisted set of [`MediaRecord`]s, one per distinct
//! file content. This crate only stores it; list/get/upsert/delete is the
//! whole of the [`CatalogStore`] contract, and deciding *what* to write is up
//! to the reconciliation engine in `shoebox-library`.
//!
//! # Layout
//! - `media` table: one row per record, `content_hash` unique.
//! - `key_values` table: typed settings, including the server identity.
//!
//! The database file lives in the metadata directory; it can be rebuilt by
//! rescanning the library, but upload declarations and capture times would
//! have to be redone.

mod db;
pub mod error;
mod kv;
#[cfg(feature = "mock")]
mod mock;
mod models;
mod record;
mod repo;
mod server;
mod store;

pub use crate::db::Database;
pub use crate::kv::{KeyValueStore, Value};
#[cfg(feature = "mock")]
pub use crate::mock::MockStore;
pub use crate::record::{MediaRecord, MediaStatus, UnknownMediaStatus};
pub use crate::repo::Repository;
pub use crate::server::ServerInfo;
pub use crate::store::{CatalogStore, StoreHandle};
