//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use shoebox_catalog::MediaStatus;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// A rejected concurrent scan and a duplicate upload declaration are normal
/// results, not errors.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The catalog store failed; nothing was applied to the cache.
    #[display("catalog store error")]
    Store,
    /// Received bytes do not match what was declared for record `_0`. The
    /// caller must discard them; the record is still waiting for its upload.
    #[display("uploaded file does not match the declared size and hash of media {_0}")]
    IntegrityMismatch(#[error(not(source))] u64),
    /// The record is not in a state that allows the operation.
    #[display("media {_0} is {_1}")]
    InvalidState(#[error(not(source))] u64, MediaStatus),
    #[display("media not found: {_0}")]
    NotFound(#[error(not(source))] u64),
    #[display("invalid file name: {_0:?}")]
    InvalidFileName(#[error(not(source))] String),
    /// The background scan task panicked.
    #[display("scan task failed")]
    Task,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store | Self::Task)
    }
}
