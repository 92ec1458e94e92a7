use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use shoebox_storage::{MediaFile, MediaType};
use std::path::PathBuf;
use std::str::FromStr;

/// Lifecycle state of a cataloged file.
///
/// The serialized names are part of the client protocol and must not change.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaStatus {
    /// Declared by a client, bytes not received yet.
    #[display("UPLOAD_PENDING")]
    UploadPending,
    /// File is on disk, waiting for the processing pipeline.
    #[display("PROCESSING")]
    Processing,
    /// Thumbnail and capture time resolved; servable.
    #[display("READY")]
    Ready,
}

#[derive(Debug, Display, Error)]
#[display("unknown media status: {_0:?}")]
pub struct UnknownMediaStatus(#[error(not(source))] pub String);

impl FromStr for MediaStatus {
    type Err = UnknownMediaStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPLOAD_PENDING" => Ok(Self::UploadPending),
            "PROCESSING" => Ok(Self::Processing),
            "READY" => Ok(Self::Ready),
            _ => Err(UnknownMediaStatus(s.to_string())),
        }
    }
}

/// One cataloged file.
///
/// Records are values: every stage that changes a record returns a new one
/// through the `with_*` methods instead of mutating shared state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// Assigned by the store on first insert.
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub file_name: String,
    #[serde(default)]
    pub dir_path: PathBuf,
    pub file_size: u64,
    pub content_hash: String,
    /// EXIF-style `YYYY:MM:DD HH:MM:SS`, `None` when unknown.
    #[serde(default)]
    pub capture_timestamp: Option<String>,
    #[serde(default = "MediaRecord::default_status")]
    pub status: MediaStatus,
}

impl MediaRecord {
    pub fn new(
        media_type: MediaType,
        file_name: impl Into<String>,
        dir_path: impl Into<PathBuf>,
        file_size: u64,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            media_type,
            file_name: file_name.into(),
            dir_path: dir_path.into(),
            file_size,
            content_hash: content_hash.into(),
            capture_timestamp: None,
            status: Self::default_status(),
        }
    }

    fn default_status() -> MediaStatus {
        MediaStatus::UploadPending
    }

    pub fn with_id(self, id: u64) -> Self {
        Self { id: Some(id), ..self }
    }

    pub fn with_status(self, status: MediaStatus) -> Self {
        Self { status, ..self }
    }

    pub fn with_location(self, dir_path: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            dir_path: dir_path.into(),
            file_name: file_name.into(),
            ..self
        }
    }

    pub fn with_capture_timestamp(self, capture_timestamp: Option<String>) -> Self {
        Self { capture_timestamp, ..self }
    }

    /// Full path of the file on disk.
    pub fn path(&self) -> PathBuf {
        self.dir_path.join(&self.file_name)
    }

    /// Whether the record already sits at `dir_path/file_name`.
    pub fn is_located_at(&self, dir_path: impl AsRef<std::path::Path>, file_name: impl AsRef<str>) -> bool {
        self.dir_path == dir_path.as_ref() && self.file_name == file_name.as_ref()
    }
}

/// A freshly discovered file, not yet persisted or processed.
impl From<MediaFile> for MediaRecord {
    fn from(file: MediaFile) -> Self {
        Self::new(file.media_type, file.file_name, file.dir_path, file.size, file.hash)
            .with_status(MediaStatus::Processing)
    }
}
