//! In-memory mirror of the catalog store.

use shoebox_catalog::{MediaRecord, MediaStatus};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Records by id and by content hash.
///
/// Only ever written after the store accepted the same change, so it never
/// holds anything the store doesn't. Records without an id are never cached.
#[derive(Debug, Default)]
pub(crate) struct Cache {
    by_id: BTreeMap<u64, MediaRecord>,
    by_hash: HashMap<String, u64>,
    hydrated: bool,
}

impl Cache {
    pub(crate) fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Replace the contents with `records` as listed by the store.
    pub(crate) fn hydrate(&mut self, records: impl IntoIterator<Item = MediaRecord>) {
        self.by_id.clear();
        self.by_hash.clear();
        for record in records {
            self.insert(record);
        }
        self.hydrated = true;
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    pub(crate) fn get(&self, id: u64) -> Option<&MediaRecord> {
        self.by_id.get(&id)
    }

    pub(crate) fn get_by_hash(&self, hash: &str) -> Option<&MediaRecord> {
        self.by_hash.get(hash).and_then(|id| self.by_id.get(id))
    }

    /// Snapshot of every known content hash.
    pub(crate) fn hashes(&self) -> HashSet<String> {
        self.by_hash.keys().cloned().collect()
    }

    /// Records in ascending id order; out-of-range pages come back short or
    /// empty.
    pub(crate) fn page(&self, limit: Option<usize>, offset: usize) -> Vec<MediaRecord> {
        let records = self.by_id.values().skip(offset);
        match limit {
            Some(limit) => records.take(limit).cloned().collect(),
            None => records.cloned().collect(),
        }
    }

    /// Whether any record points at `dir/file_name`.
    pub(crate) fn occupies(&self, dir: &Path, file_name: &str) -> bool {
        self.by_id.values().any(|record| record.is_located_at(dir, file_name))
    }

    pub(crate) fn with_status(&self, status: MediaStatus) -> Vec<MediaRecord> {
        self.by_id.values().filter(|record| record.status == status).cloned().collect()
    }

    pub(crate) fn insert(&mut self, record: MediaRecord) {
        let Some(id) = record.id else {
            return;
        };
        if let Some(previous) = self.by_id.get(&id)
            && previous.content_hash != record.content_hash
        {
            self.by_hash.remove(&previous.content_hash);
        }
        self.by_hash.insert(record.content_hash.clone(), id);
        self.by_id.insert(id, record);
    }

    pub(crate) fn remove(&mut self, record: &MediaRecord) {
        let Some(id) = record.id else {
            return;
        };
        if let Some(removed) = self.by_id.remove(&id)
            && self.by_hash.get(&removed.content_hash) == Some(&id)
        {
            self.by_hash.remove(&removed.content_hash);
        }
    }
}
