//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why the configuration was rejected. None of these go away on retry.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("config file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("unsupported config file format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// The merged sources don't deserialize.
    #[display("invalid configuration")]
    Invalid,
    #[display("at least one media directory is required")]
    NoMediaDirs,
    #[display("{_0} must be an absolute path: {}", _1.display())]
    NotAbsolute(&'static str, PathBuf),
    #[display("{_0} does not exist or is not a directory: {}", _1.display())]
    MissingDirectory(&'static str, PathBuf),
    #[display("processing.filename_date_regex and processing.filename_date_format must be set together")]
    IncompleteFilenameDate,
    #[display("invalid filename date options")]
    InvalidFilenameDate,
    #[display("processing.thumbnail_size must be greater than zero")]
    ThumbnailSize,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
