//! Media processing pipeline.
//!
//! Takes a record whose file is on disk and hands it back
//! [`Ready`](shoebox_catalog::MediaStatus::Ready), with a capture time and a
//! thumbnail where those could be worked out. The reconciliation engine only
//! sees the [`MediaProcessor`] trait.

mod capture;
pub mod error;
mod pipeline;
mod thumbnail;

pub use crate::capture::{EXIF_DATETIME, FilenameDate};
pub use crate::pipeline::{DEFAULT_THUMBNAIL_SIZE, Pipeline};
use async_trait::async_trait;
use shoebox_catalog::MediaRecord;
use std::path::PathBuf;
use std::sync::Arc;

pub type ProcessorHandle = Arc<dyn MediaProcessor + Send + Sync>;

/// Advances a record with a confirmed on-disk file to `Ready`.
///
/// Implementations must be safe to call repeatedly for the same record: a
/// second run overwrites whatever the first one produced.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Never fails; anything that can't be worked out is left unset.
    async fn process(&self, record: MediaRecord) -> MediaRecord;

    /// Where the thumbnail for `record` is (or would be) written. `None` for
    /// records that have not been persisted yet.
    fn thumbnail_path(&self, record: &MediaRecord) -> Option<PathBuf>;
}
