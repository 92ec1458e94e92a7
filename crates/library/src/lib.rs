//! The library reconciliation engine.
//!
//! [`Library`] keeps the catalog in step with the media directories on disk
//! and runs the upload handshake. It is the only writer of the catalog
//! store: every change goes to the store first and into its in-memory cache
//! second, one writer at a time.

mod cache;
pub mod error;
mod library;
mod reconcile;
mod status;
mod upload;

pub use crate::library::Library;
pub use crate::status::{LibraryScanStatus, ScanState};
pub use crate::upload::Negotiation;
