//! SQLite implementation of the catalog store.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::MediaRow;
use crate::record::MediaRecord;
use crate::store::CatalogStore;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqlitePool;
use tracing::instrument;

/// Catalog records backed by the `media` table.
///
/// `content_hash` carries a unique constraint, so the database itself refuses
/// a second record for the same content even if a caller gets it wrong.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}

impl Repository {
    fn db_id(id: u64) -> Result<i64> {
        i64::try_from(id).or_raise(|| ErrorKind::InvalidData("media id"))
    }

    fn returned_id(id: i64) -> Result<u64> {
        u64::try_from(id).or_raise(|| ErrorKind::InvalidData("media id"))
    }
}

#[async_trait]
impl CatalogStore for Repository {
    async fn list(&self) -> Result<Vec<MediaRecord>> {
        let rows: Vec<MediaRow> = sqlx::query_as(include_str!("../queries/list_media.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(MediaRecord::try_from).collect()
    }

    async fn get(&self, id: u64) -> Result<Option<MediaRecord>> {
        let row: Option<MediaRow> = sqlx::query_as(include_str!("../queries/get_media.sql"))
            .bind(Self::db_id(id)?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(MediaRecord::try_from).transpose()
    }

    #[instrument(level = "debug", skip_all, fields(id = ?record.id, hash = %record.content_hash))]
    async fn upsert(&self, record: &MediaRecord) -> Result<u64> {
        let row = MediaRow::try_from(record)?;
        let query = match row.id {
            None => sqlx::query_scalar(include_str!("../queries/insert_media.sql")),
            Some(id) => sqlx::query_scalar(include_str!("../queries/upsert_media.sql")).bind(id),
        };
        let id: i64 = query
            .bind(row.media_type)
            .bind(row.file_name)
            .bind(row.dir_path)
            .bind(row.file_size)
            .bind(row.content_hash)
            .bind(row.capture_timestamp)
            .bind(row.status)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Self::returned_id(id)
    }

    #[instrument(level = "debug", skip_all, fields(id = ?record.id))]
    async fn delete(&self, record: &MediaRecord) -> Result<()> {
        let Some(id) = record.id else {
            return Ok(());
        };
        sqlx::query(include_str!("../queries/delete_media.sql"))
            .bind(Self::db_id(id)?)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MediaStatus;
    use shoebox_storage::MediaType;

    async fn repository() -> Repository {
        let db = Database::connect_in_memory().await.unwrap();
        Repository::from(&db)
    }

    fn record(name: &str, hash: &str) -> MediaRecord {
        MediaRecord::new(MediaType::Picture, name, "/srv/media", 100, hash).with_status(MediaStatus::Processing)
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let repo = repository().await;
        let first = repo.upsert(&record("a.jpg", "aaa")).await.unwrap();
        let second = repo.upsert(&record("b.jpg", "bbb")).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        let all = repo.list().await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), [Some(1), Some(2)]);
    }

    #[tokio::test]
    async fn test_upsert_with_id_updates_in_place() {
        let repo = repository().await;
        let id = repo.upsert(&record("a.jpg", "aaa")).await.unwrap();
        let moved = record("a.jpg", "aaa")
            .with_id(id)
            .with_location("/srv/media/2024", "renamed.jpg")
            .with_status(MediaStatus::Ready)
            .with_capture_timestamp(Some("2024:06:01 12:00:00".to_string()));
        assert_eq!(repo.upsert(&moved).await.unwrap(), id);
        assert_eq!(repo.get(id).await.unwrap(), Some(moved));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_content_hash_is_refused() {
        let repo = repository().await;
        repo.upsert(&record("a.jpg", "aaa")).await.unwrap();
        let err = repo.upsert(&record("copy.jpg", "aaa")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Database));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = repository().await;
        let id = repo.upsert(&record("a.jpg", "aaa")).await.unwrap();
        let stored = repo.get(id).await.unwrap().unwrap();
        repo.delete(&stored).await.unwrap();
        assert_eq!(repo.get(id).await.unwrap(), None);
        // Already gone, and never persisted: both fine.
        repo.delete(&stored).await.unwrap();
        repo.delete(&record("b.jpg", "bbb")).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_missing() {
        let repo = repository().await;
        assert_eq!(repo.get(42).await.unwrap(), None);
    }
}
