//! Processing Error Types
//!
//! Pipeline stages are best-effort, so most of these end up in a log line
//! rather than in front of a caller. Only [`FilenameDate`](crate::FilenameDate)
//! construction surfaces them directly.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A processing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("I/O error")]
    Io,
    #[display("could not decode image: {}", _0.display())]
    Decode(#[error(not(source))] PathBuf),
    #[display("could not write thumbnail: {}", _0.display())]
    Encode(#[error(not(source))] PathBuf),
    /// ffmpeg is not configured and not on `PATH`.
    #[display("ffmpeg not found")]
    FfmpegNotFound,
    /// ffmpeg exited unsuccessfully; `None` when killed by a signal.
    #[display("ffmpeg exited with code: {_0:?}")]
    FfmpegFailed(#[error(not(source))] Option<i32>),
    /// ffmpeg succeeded but the video has no frame at that index.
    #[display("no video frame at index {_0}")]
    NoFrame(#[error(not(source))] u32),
    #[display("invalid file name date pattern: {_0:?}")]
    InvalidPattern(#[error(not(source))] String),
    #[display("invalid file name date format: {_0:?}")]
    InvalidFormat(#[error(not(source))] String),
    /// The blocking processing task panicked or was cancelled.
    #[display("processing task failed")]
    Task,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io | Self::Task)
    }
}
