//! Library scans.
//!
//! A scan diffs a filesystem walk against the cached catalog. Identity is the
//! content hash alone:
//!
//! - unknown hash: a **new** file, cataloged as `Processing`;
//! - known hash at another location: the file was **moved** (or renamed),
//!   the record follows it and keeps its id;
//! - known hash at the same location: **unchanged**, nothing is written;
//! - known hash never seen by the walk: **removed** from the catalog.
//!
//! Two distinct files with byte-identical content share one record. The
//! first one the walk reaches keeps it; later sightings in the same walk
//! count as unchanged.
//!
//! Every record left in `Processing` afterwards goes through the pipeline.

use crate::error::{ErrorKind, Result};
use crate::library::{Inner, Library};
use crate::status::{LibraryScanStatus, ScanState};
use futures::StreamExt;
use shoebox_catalog::{MediaRecord, MediaStatus};
use shoebox_storage::MediaFile;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError};
use std::sync::atomic::Ordering;
use tracing::instrument;

enum Observed {
    New,
    Moved,
    Unchanged,
}

/// Clears the in-flight flag when the scan task ends, however it ends.
struct ScanGuard(Arc<Inner>);
impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.0.scanning.store(false, Ordering::SeqCst);
    }
}

impl Library {
    /// Start a background scan unless one is already running.
    ///
    /// Returns `false`, and does nothing, while another scan is in flight;
    /// requests are never queued. Must be called from within a Tokio runtime.
    pub fn scan_library(&self) -> bool {
        // Held until the new handle is stored.
        let mut slot = self.inner.task.lock().unwrap_or_else(PoisonError::into_inner);
        if self
            .inner
            .scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Library scan already running");
            return false;
        }
        let guard = ScanGuard(self.inner.clone());
        *slot = Some(tokio::spawn(async move {
            let result = guard.0.reconcile().await;
            if let Err(err) = &result {
                tracing::error!(error = ?err, "Library scan aborted");
            }
            drop(guard);
            result
        }));
        true
    }

    /// Wait for the in-flight scan, if any, and return its final status.
    ///
    /// With no scan in flight this is the last published status. Only one
    /// caller observes a failed scan's error; others get the status it left
    /// behind.
    pub async fn wait_for_scan(&self) -> Result<Option<LibraryScanStatus>> {
        match self.take_task() {
            Some(task) => {
                let status = match task.await {
                    Ok(result) => result?,
                    Err(err) => {
                        tracing::error!(error = %err, "Library scan task failed");
                        exn::bail!(ErrorKind::Task);
                    },
                };
                Ok(Some(status))
            },
            None => Ok(self.scan_status()),
        }
    }
}

impl Inner {
    #[instrument(name = "library_scan", skip_all)]
    pub(crate) async fn reconcile(&self) -> Result<LibraryScanStatus> {
        self.hydrate().await?;
        let mut missing = self.cache.read().await.hashes();
        let mut seen = HashSet::new();
        let mut unchanged: u64 = 0;
        let mut status = LibraryScanStatus::started();
        self.publish(&status);
        tracing::info!(roots = ?self.scanner.roots(), known = missing.len(), "Library scan started");

        let mut files = self.scanner.scan();
        while let Some(file) = files.next().await {
            let hash = file.hash.clone();
            let observed = if seen.insert(hash.clone()) {
                self.merge(file).await?
            } else {
                tracing::debug!(path = %file.path().display(), %hash, "Duplicate content; already tracked elsewhere");
                Observed::Unchanged
            };
            missing.remove(&hash);
            status.media_files_detected += 1;
            match observed {
                Observed::New => status.new_files += 1,
                Observed::Moved => status.files_moved += 1,
                Observed::Unchanged => unchanged += 1,
            }
            self.publish(&status);
        }

        for hash in missing {
            if self.remove_missing(&hash).await? {
                status.files_removed += 1;
            }
        }

        let pending = self.cache.read().await.with_status(MediaStatus::Processing);
        status = status.with_state(ScanState::ProcessingFiles);
        status.files_to_process = pending.len() as u64;
        self.publish(&status);
        for record in pending {
            self.process(record).await?;
            status.files_processed += 1;
            self.publish(&status);
        }

        status = status.with_state(ScanState::Done);
        self.publish(&status);
        tracing::info!(
            detected = status.media_files_detected,
            new = status.new_files,
            moved = status.files_moved,
            existing = unchanged,
            removed = status.files_removed,
            processed = status.files_processed,
            "Library scan complete"
        );
        Ok(status)
    }

    /// Classify one walked file against the catalog and apply the outcome.
    async fn merge(&self, file: MediaFile) -> Result<Observed> {
        let writer = self.writer.lock().await;
        let existing = self.cache.read().await.get_by_hash(&file.hash).cloned();
        match existing {
            None => {
                let record = self.persist(&writer, MediaRecord::from(file)).await?;
                tracing::debug!(id = ?record.id, path = %record.path().display(), "New media file");
                Ok(Observed::New)
            },
            Some(existing) if existing.is_located_at(&file.dir_path, &file.file_name) => Ok(Observed::Unchanged),
            Some(existing) => {
                let from = existing.path();
                let record = self.persist(&writer, existing.with_location(file.dir_path, file.file_name)).await?;
                tracing::debug!(id = ?record.id, from = %from.display(), to = %record.path().display(), "Media file moved");
                Ok(Observed::Moved)
            },
        }
    }

    /// Drop the record for a hash the walk never saw. Returns `false` if it
    /// was already gone.
    async fn remove_missing(&self, hash: &str) -> Result<bool> {
        let writer = self.writer.lock().await;
        let Some(record) = self.cache.read().await.get_by_hash(hash).cloned() else {
            return Ok(false);
        };
        self.remove(&writer, &record).await?;
        tracing::debug!(id = ?record.id, path = %record.path().display(), status = %record.status, "Media file missing; removed from catalog");
        Ok(true)
    }

    /// Run one record through the pipeline and store the result, unless the
    /// record changed or disappeared in the meantime (then `None`).
    pub(crate) async fn process(&self, record: MediaRecord) -> Result<Option<MediaRecord>> {
        let processed = self.processor.process(record.clone()).await;
        let writer = self.writer.lock().await;
        let current = match record.id {
            Some(id) => self.cache.read().await.get(id) == Some(&record),
            None => false,
        };
        if !current {
            tracing::debug!(id = ?record.id, "Record changed while processing; result discarded");
            return Ok(None);
        }
        Ok(Some(self.persist(&writer, processed).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::tests::{CAPTURED, Fixture, StubProcessor, fixture, fixture_with};
    use shoebox_catalog::{CatalogStore, MockStore};
    use shoebox_storage::MediaType;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    async fn scan(fx: &Fixture) -> LibraryScanStatus {
        assert!(fx.library.scan_library());
        fx.library.wait_for_scan().await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_new_files_are_cataloged_and_processed() {
        let fx = fixture();
        fx.write("a.jpg", b"picture");
        fx.write("2024/clip.mp4", b"video");
        fx.write("notes.txt", b"ignored");
        let status = scan(&fx).await;
        assert!(status.is_done());
        assert_eq!(status.media_files_detected, 2);
        assert_eq!(status.new_files, 2);
        assert_eq!((status.files_to_process, status.files_processed), (2, 2));
        assert_eq!(fx.library.scan_status(), Some(status));

        let records = fx.library.list_media(None, 0).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == MediaStatus::Ready));
        assert!(records.iter().all(|r| r.capture_timestamp.as_deref() == Some(CAPTURED)));
        let clip = records.iter().find(|r| r.media_type == MediaType::Video).unwrap();
        assert_eq!(clip.dir_path, fx.media().join("2024"));
        // Cache and store agree.
        assert_eq!(fx.store.list().await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_unchanged_library_writes_nothing() {
        let fx = fixture();
        fx.write("a.jpg", b"picture");
        scan(&fx).await;
        let writes = fx.store.upserts();
        let status = scan(&fx).await;
        assert_eq!(status.media_files_detected, 1);
        assert_eq!((status.new_files, status.files_moved, status.files_removed), (0, 0, 0));
        assert_eq!(status.files_to_process, 0);
        assert_eq!(fx.store.upserts(), writes);
        assert_eq!(fx.processor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_moved_file_keeps_its_record() {
        let fx = fixture();
        let original = fx.write("a/img.jpg", b"same bytes");
        scan(&fx).await;
        let before = fx.library.list_media(None, 0).await.unwrap().remove(0);

        std::fs::create_dir_all(fx.media().join("b")).unwrap();
        std::fs::rename(&original, fx.media().join("b/img.jpg")).unwrap();
        let status = scan(&fx).await;
        assert_eq!((status.files_moved, status.new_files, status.files_removed), (1, 0, 0));

        let after = fx.library.get_media(before.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(after.dir_path, fx.media().join("b"));
        assert_eq!(after.status, MediaStatus::Ready);
        assert_eq!(fx.library.list_media(None, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_files_are_removed() {
        let fx = fixture();
        let gone = fx.write("gone.jpg", b"gone");
        fx.write("kept.jpg", b"kept");
        scan(&fx).await;
        std::fs::remove_file(gone).unwrap();
        let status = scan(&fx).await;
        assert_eq!(status.files_removed, 1);
        let records = fx.library.list_media(None, 0).await.unwrap();
        assert_eq!(records.iter().map(|r| r.file_name.as_str()).collect::<Vec<_>>(), ["kept.jpg"]);
        assert_eq!(fx.store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_identical_content_collapses_onto_one_record() {
        let fx = fixture();
        fx.write("a/copy.jpg", b"same bytes");
        fx.write("b/copy.jpg", b"same bytes");
        let first = scan(&fx).await;
        assert_eq!((first.media_files_detected, first.new_files, first.files_moved), (2, 1, 0));
        let tracked = fx.library.list_media(None, 0).await.unwrap();
        assert_eq!(tracked.len(), 1);

        let second = scan(&fx).await;
        assert_eq!((second.media_files_detected, second.new_files, second.files_removed), (2, 0, 0));
        let retracked = fx.library.list_media(None, 0).await.unwrap();
        assert_eq!(retracked.len(), 1);
        assert_eq!(retracked[0].id, tracked[0].id);
    }

    #[tokio::test]
    async fn test_leftover_processing_records_are_picked_up() {
        let fx = fixture();
        let path = fx.write("a.jpg", b"interrupted");
        let hash = shoebox_storage::hash_file(&path).await.unwrap();
        fx.store
            .upsert(&MediaRecord::new(MediaType::Picture, "a.jpg", fx.media(), 11, hash).with_status(MediaStatus::Processing))
            .await
            .unwrap();
        let status = scan(&fx).await;
        assert_eq!((status.new_files, status.files_to_process, status.files_processed), (0, 1, 1));
        assert_eq!(fx.library.get_media(1).await.unwrap().unwrap().status, MediaStatus::Ready);
    }

    #[tokio::test]
    async fn test_second_scan_is_rejected_while_running() {
        let processor = StubProcessor {
            gate: Some(Semaphore::new(0)),
            ..StubProcessor::default()
        };
        let fx = fixture_with(MockStore::default(), processor);
        fx.write("a.jpg", b"picture");
        let mut updates = fx.library.subscribe();

        assert!(fx.library.scan_library());
        updates
            .wait_for(|status| status.as_ref().is_some_and(|s| s.state == ScanState::ProcessingFiles))
            .await
            .unwrap();
        assert!(fx.library.is_scanning());
        assert!(!fx.library.scan_library());

        fx.processor.gate.as_ref().unwrap().add_permits(1);
        let status = fx.library.wait_for_scan().await.unwrap().unwrap();
        assert!(status.is_done());
        assert_eq!(fx.processor.calls.load(Ordering::SeqCst), 1);
        assert!(!fx.library.is_scanning());
        assert!(fx.library.scan_library());
        fx.library.wait_for_scan().await.unwrap();
    }

    #[tokio::test]
    async fn test_requests_are_served_during_a_scan() {
        let processor = StubProcessor {
            gate: Some(Semaphore::new(0)),
            ..StubProcessor::default()
        };
        let fx = fixture_with(MockStore::default(), processor);
        fx.write("a.jpg", b"picture");
        let mut updates = fx.library.subscribe();
        assert!(fx.library.scan_library());
        updates
            .wait_for(|status| status.as_ref().is_some_and(|s| s.state == ScanState::ProcessingFiles))
            .await
            .unwrap();

        let upload = MediaRecord::new(MediaType::Picture, "upload.jpg", "/elsewhere", 5, "feed");
        let requests = async {
            let negotiated = fx.library.negotiate_upload(upload).await.unwrap().into_record();
            let listed = fx.library.list_media(None, 0).await.unwrap();
            let fetched = fx.library.get_media(negotiated.id.unwrap()).await.unwrap();
            (negotiated, listed, fetched)
        };
        let (negotiated, listed, fetched) = tokio::time::timeout(Duration::from_secs(5), requests).await.unwrap();
        assert!(fx.library.is_scanning());
        assert_eq!(listed.len(), 2);
        assert_eq!(fetched.as_ref(), Some(&negotiated));

        fx.processor.gate.as_ref().unwrap().add_permits(1);
        let status = fx.library.wait_for_scan().await.unwrap().unwrap();
        assert_eq!((status.files_removed, status.files_processed), (0, 1));
        let survivor = fx.library.get_media(negotiated.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(survivor.status, MediaStatus::UploadPending);
    }

    #[tokio::test]
    async fn test_each_wait_returns_its_own_scan() {
        let fx = fixture();
        fx.write("a.jpg", b"first");
        assert!(fx.library.scan_library());
        let first = fx.library.wait_for_scan().await.unwrap().unwrap();
        fx.write("b.jpg", b"second");
        assert!(fx.library.scan_library());
        let second = fx.library.wait_for_scan().await.unwrap().unwrap();
        assert_eq!((first.media_files_detected, first.new_files), (1, 1));
        assert_eq!((second.media_files_detected, second.new_files), (2, 1));
        // Nothing left to join.
        assert_eq!(fx.library.wait_for_scan().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_store_failure_aborts_scan() {
        let fx = fixture();
        fx.write("a.jpg", b"picture");
        fx.store.fail_writes(true);
        assert!(fx.library.scan_library());
        let err = fx.library.wait_for_scan().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Store));
        // Nothing reached the cache, and the status stopped mid-way.
        assert!(fx.library.list_media(None, 0).await.unwrap().is_empty());
        assert_eq!(fx.library.scan_status().unwrap().state, ScanState::ScanningForFiles);

        fx.store.fail_writes(false);
        let status = scan(&fx).await;
        assert_eq!(status.new_files, 1);
    }

    #[tokio::test]
    async fn test_scan_status_is_published_while_walking() {
        let fx = fixture();
        for n in 0..3 {
            fx.write(&format!("{n}.jpg"), format!("picture {n}").as_bytes());
        }
        let updates = fx.library.subscribe();
        let status = scan(&fx).await;
        assert_eq!(status.media_files_detected, 3);
        assert_eq!(*updates.borrow(), Some(status));
    }
}
