//! In-memory catalog store for testing.

use crate::error::{ErrorKind, Result};
use crate::record::MediaRecord;
use crate::store::CatalogStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    records: BTreeMap<u64, MediaRecord>,
    last_id: u64,
}

/// In-memory catalog store for testing.
///
/// Behaves like [`Repository`](crate::Repository): ids are assigned in
/// increasing order and a duplicate content hash is refused. Writes can be
/// made to fail on demand, and every successful write is counted.
///
/// # Examples
///
/// ```
/// use shoebox_catalog::{CatalogStore, MediaRecord, MockStore};
/// use shoebox_storage::MediaType;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MockStore::default();
/// let id = store.upsert(&MediaRecord::new(MediaType::Picture, "a.jpg", "/srv", 1, "abc")).await.unwrap();
/// assert_eq!(id, 1);
///
/// store.fail_writes(true);
/// assert!(store.upsert(&MediaRecord::new(MediaType::Picture, "b.jpg", "/srv", 1, "def")).await.is_err());
/// # }
/// ```
#[derive(Default)]
pub struct MockStore {
    state: RwLock<State>,
    fail_writes: AtomicBool,
    upserts: AtomicUsize,
    deletes: AtomicUsize,
}

impl MockStore {
    /// Store pre-populated with `records`; records without an id get the
    /// next free one.
    pub fn with_records(records: impl IntoIterator<Item = MediaRecord>) -> Self {
        let mut state = State::default();
        for record in records {
            let id = record.id.unwrap_or(state.last_id + 1);
            state.last_id = state.last_id.max(id);
            state.records.insert(id, record.with_id(id));
        }
        Self {
            state: RwLock::new(state),
            ..Self::default()
        }
    }

    /// Make every following `upsert`/`delete` fail with
    /// [`ErrorKind::Database`] (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful `upsert` calls so far.
    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Successful `delete` calls so far.
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Database);
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MockStore {
    async fn list(&self) -> Result<Vec<MediaRecord>> {
        Ok(self.state.read().await.records.values().cloned().collect())
    }

    async fn get(&self, id: u64) -> Result<Option<MediaRecord>> {
        Ok(self.state.read().await.records.get(&id).cloned())
    }

    async fn upsert(&self, record: &MediaRecord) -> Result<u64> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let id = record.id.unwrap_or(state.last_id + 1);
        let duplicate = state
            .records
            .values()
            .any(|other| other.id != Some(id) && other.content_hash == record.content_hash);
        if duplicate {
            exn::bail!(ErrorKind::Database);
        }
        state.last_id = state.last_id.max(id);
        state.records.insert(id, record.clone().with_id(id));
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn delete(&self, record: &MediaRecord) -> Result<()> {
        self.check_writable()?;
        if let Some(id) = record.id {
            self.state.write().await.records.remove(&id);
        }
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
