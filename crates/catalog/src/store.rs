use crate::error::Result;
use crate::record::MediaRecord;
use async_trait::async_trait;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn CatalogStore + Send + Sync>;

/// Durable, id-indexed storage of catalog records.
///
/// The store is a plain CRUD surface. It does not deduplicate, classify or
/// cache; the reconciliation engine owns all of that and only calls in here
/// to make a change durable before applying it to its own view.
///
/// # Examples
///
/// ```
/// use shoebox_catalog::{CatalogStore, MediaRecord, MediaStatus, error::Result};
///
/// async fn mark_ready(store: &dyn CatalogStore, id: u64) -> Result<Option<u64>> {
///     let Some(record) = store.get(id).await? else {
///         return Ok(None);
///     };
///     let id = store.upsert(&record.with_status(MediaStatus::Ready)).await?;
///     Ok(Some(id))
/// }
/// ```
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every record, in ascending id order.
    async fn list(&self) -> Result<Vec<MediaRecord>>;

    async fn get(&self, id: u64) -> Result<Option<MediaRecord>>;

    /// Insert a record without an id, or replace the record with its id.
    ///
    /// Returns the record's id, newly assigned on first insert. Writing a
    /// content hash that another record already holds is a database error.
    async fn upsert(&self, record: &MediaRecord) -> Result<u64>;

    /// Remove a record. Records that were never persisted, or are already
    /// gone, are ignored.
    async fn delete(&self, record: &MediaRecord) -> Result<()>;
}
