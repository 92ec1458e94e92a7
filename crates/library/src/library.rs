use crate::cache::Cache;
use crate::error::{ErrorKind, Result};
use crate::status::LibraryScanStatus;
use exn::ResultExt;
use shoebox_catalog::{MediaRecord, StoreHandle};
use shoebox_process::ProcessorHandle;
use shoebox_storage::Scanner;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{MutexGuard, RwLock, watch};
use tokio::task::JoinHandle;

/// Proof that the caller holds the single-writer lock.
pub(crate) type WriteGuard<'a> = MutexGuard<'a, ()>;

pub(crate) struct Inner {
    pub(crate) store: StoreHandle,
    pub(crate) scanner: Scanner,
    pub(crate) processor: ProcessorHandle,
    pub(crate) uploads_dir: PathBuf,
    pub(crate) cache: RwLock<Cache>,
    /// Serialises every store-then-cache mutation.
    pub(crate) writer: tokio::sync::Mutex<()>,
    pub(crate) scanning: AtomicBool,
    pub(crate) task: Mutex<Option<JoinHandle<Result<LibraryScanStatus>>>>,
    pub(crate) status: watch::Sender<Option<LibraryScanStatus>>,
}

/// The reconciliation engine.
///
/// Owns the cached view of the catalog and is the only thing that writes to
/// the store. Cheap to clone; clones share the same cache and scan state.
///
/// The scanner must cover the upload staging directory as well as the media
/// roots, otherwise confirmed uploads are dropped as missing by the next scan.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use shoebox_catalog::{Database, Repository};
/// use shoebox_library::Library;
/// use shoebox_process::Pipeline;
/// use shoebox_storage::{Extensions, Scanner};
///
/// # async fn example() {
/// let db = Database::connect("/var/lib/shoebox/catalog.db").await.unwrap();
/// let scanner = Scanner::new(["/srv/photos", "/srv/uploads"], Extensions::default())
///     .excluding("/var/lib/shoebox");
/// let library = Library::new(
///     Arc::new(Repository::from(&db)),
///     scanner,
///     Arc::new(Pipeline::new("/var/lib/shoebox/thumbs")),
///     "/srv/uploads",
/// );
/// if library.scan_library() {
///     let status = library.wait_for_scan().await.unwrap();
///     println!("{status:?}");
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct Library {
    pub(crate) inner: Arc<Inner>,
}

impl Library {
    pub fn new(
        store: StoreHandle,
        scanner: Scanner,
        processor: ProcessorHandle,
        uploads_dir: impl Into<PathBuf>,
    ) -> Self {
        let (status, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                store,
                scanner,
                processor,
                uploads_dir: uploads_dir.into(),
                cache: RwLock::new(Cache::default()),
                writer: tokio::sync::Mutex::new(()),
                scanning: AtomicBool::new(false),
                task: Mutex::new(None),
                status,
            }),
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.inner.uploads_dir
    }

    /// A page of records in ascending id order. `None` means no limit.
    pub async fn list_media(&self, limit: Option<usize>, offset: usize) -> Result<Vec<MediaRecord>> {
        self.inner.hydrate().await?;
        Ok(self.inner.cache.read().await.page(limit, offset))
    }

    pub async fn get_media(&self, id: u64) -> Result<Option<MediaRecord>> {
        self.inner.hydrate().await?;
        Ok(self.inner.cache.read().await.get(id).cloned())
    }

    /// Where the record's thumbnail lives, once processed.
    pub fn thumbnail_path(&self, record: &MediaRecord) -> Option<PathBuf> {
        self.inner.processor.thumbnail_path(record)
    }

    /// Latest published scan status; `None` until the first scan starts.
    pub fn scan_status(&self) -> Option<LibraryScanStatus> {
        self.inner.status.borrow().clone()
    }

    /// Every status snapshot from now on.
    pub fn subscribe(&self) -> watch::Receiver<Option<LibraryScanStatus>> {
        self.inner.status.subscribe()
    }

    /// Whether a scan is in flight right now.
    pub fn is_scanning(&self) -> bool {
        self.inner.scanning.load(Ordering::SeqCst)
    }

    pub(crate) fn take_task(&self) -> Option<JoinHandle<Result<LibraryScanStatus>>> {
        self.inner.task.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

impl Inner {
    /// Load the cache from the store on first use.
    pub(crate) async fn hydrate(&self) -> Result<()> {
        if self.cache.read().await.is_hydrated() {
            return Ok(());
        }
        let mut cache = self.cache.write().await;
        if cache.is_hydrated() {
            return Ok(());
        }
        let records = self.store.list().await.or_raise(|| ErrorKind::Store)?;
        cache.hydrate(records);
        tracing::debug!(records = cache.len(), "Catalog cache hydrated");
        Ok(())
    }

    /// Write `record` to the store, then to the cache. Returns it with its id.
    pub(crate) async fn persist(&self, _writer: &WriteGuard<'_>, record: MediaRecord) -> Result<MediaRecord> {
        let id = self.store.upsert(&record).await.or_raise(|| ErrorKind::Store)?;
        let record = record.with_id(id);
        self.cache.write().await.insert(record.clone());
        Ok(record)
    }

    pub(crate) async fn remove(&self, _writer: &WriteGuard<'_>, record: &MediaRecord) -> Result<()> {
        self.store.delete(record).await.or_raise(|| ErrorKind::Store)?;
        self.cache.write().await.remove(record);
        Ok(())
    }

    pub(crate) fn publish(&self, status: &LibraryScanStatus) {
        self.status.send_replace(Some(status.clone()));
    }
}
