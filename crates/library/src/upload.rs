//! Upload handshake.
//!
//! A client declares what it is about to send, the engine reserves a record
//! in the staging directory, and once the bytes are on disk the client
//! confirms with what was actually received.

use crate::error::{ErrorKind, Result};
use crate::library::Library;
use exn::{OptionExt, ResultExt};
use shoebox_catalog::{MediaRecord, MediaStatus};
use shoebox_storage::validate_file_name;
use tracing::instrument;

/// Outcome of an upload declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    /// A fresh record, waiting for its bytes.
    Created(MediaRecord),
    /// The content is already cataloged; nothing was written.
    Existing(MediaRecord),
}

impl Negotiation {
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn record(&self) -> &MediaRecord {
        match self {
            Self::Created(record) | Self::Existing(record) => record,
        }
    }

    pub fn into_record(self) -> MediaRecord {
        match self {
            Self::Created(record) | Self::Existing(record) => record,
        }
    }
}

impl Library {
    /// Declare an upload.
    ///
    /// Only the type, file name, size and hash of `declared` are used. Known
    /// content returns the existing record untouched, whatever its name.
    /// Otherwise a record is stored as `UploadPending` in the staging
    /// directory, where the caller must write the bytes. The caller must use
    /// the returned record's file name, which differs from the declared one
    /// when another record already holds that name.
    #[instrument(skip_all, fields(file_name = %declared.file_name, size = declared.file_size))]
    pub async fn negotiate_upload(&self, declared: MediaRecord) -> Result<Negotiation> {
        let file_name =
            validate_file_name(&declared.file_name).or_raise(|| ErrorKind::InvalidFileName(declared.file_name.clone()))?;
        let hash = declared.content_hash.to_ascii_lowercase();
        self.inner.hydrate().await?;

        let writer = self.inner.writer.lock().await;
        if let Some(existing) = self.inner.cache.read().await.get_by_hash(&hash).cloned() {
            tracing::debug!(id = ?existing.id, status = %existing.status, "Upload already cataloged");
            return Ok(Negotiation::Existing(existing));
        }
        let file_name = self.staging_name(file_name, &hash).await;
        let pending = MediaRecord::new(declared.media_type, file_name, self.uploads_dir(), declared.file_size, hash)
            .with_status(MediaStatus::UploadPending);
        let record = self.inner.persist(&writer, pending).await?;
        tracing::info!(id = ?record.id, path = %record.path().display(), "Upload reserved");
        Ok(Negotiation::Created(record))
    }

    /// `file_name`, or `<first 8 hash chars>-<file_name>` when another record
    /// already sits at that staging path.
    async fn staging_name(&self, file_name: String, hash: &str) -> String {
        if !self.inner.cache.read().await.occupies(self.uploads_dir(), &file_name) {
            return file_name;
        }
        let prefix: String = hash.chars().take(8).collect();
        let renamed = format!("{prefix}-{file_name}");
        tracing::debug!(%file_name, %renamed, "Staging name taken; disambiguated");
        renamed
    }

    /// Confirm that the bytes for `record` are on disk.
    ///
    /// The record must still be waiting for its upload. On a size or hash
    /// mismatch the record stays `UploadPending` and the caller must delete
    /// what it received. On success the record is processed before this
    /// returns, and the processed record comes back.
    #[instrument(skip_all, fields(id = ?record.id, actual_size = actual_size))]
    pub async fn confirm_upload(&self, record: &MediaRecord, actual_size: u64, actual_hash: &str) -> Result<MediaRecord> {
        let id = record.id.ok_or_raise(|| ErrorKind::NotFound(0))?;
        self.inner.hydrate().await?;

        let writer = self.inner.writer.lock().await;
        let current = self
            .inner
            .cache
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_raise(|| ErrorKind::NotFound(id))?;
        if current.status != MediaStatus::UploadPending {
            exn::bail!(ErrorKind::InvalidState(id, current.status));
        }
        if current.file_size != actual_size || !current.content_hash.eq_ignore_ascii_case(actual_hash) {
            tracing::warn!(
                declared_size = current.file_size,
                declared_hash = %current.content_hash,
                actual_hash,
                "Upload does not match its declaration"
            );
            exn::bail!(ErrorKind::IntegrityMismatch(id));
        }
        let received = self.inner.persist(&writer, current.with_status(MediaStatus::Processing)).await?;
        drop(writer);

        match self.inner.process(received).await? {
            Some(processed) => {
                tracing::info!(status = %processed.status, "Upload processed");
                Ok(processed)
            },
            // Moved or removed by a scan while it was being processed.
            None => self.get_media(id).await?.ok_or_raise(|| ErrorKind::NotFound(id)),
        }
    }
}
