//! Typed key-value settings stored alongside the catalog.

use crate::Database;
use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use sqlx::SqlitePool;

/// A stored setting.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Real(f64),
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
        }
    }

    fn decode(kind: &str, value: String) -> Result<Self> {
        Ok(match kind {
            "text" => Self::Text(value),
            "integer" => Self::Integer(value.parse::<i64>().or_raise(|| ErrorKind::InvalidData("integer value"))?),
            "real" => Self::Real(value.parse::<f64>().or_raise(|| ErrorKind::InvalidData("real value"))?),
            _ => exn::bail!(ErrorKind::InvalidData("value kind")),
        })
    }
}

/// Settings in the `key_values` table.
///
/// Each value remembers its kind; the typed getters refuse to reinterpret a
/// value stored as another kind.
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    pool: SqlitePool,
}
impl From<&Database> for KeyValueStore {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}

impl KeyValueStore {
    pub async fn get(&self, key: impl AsRef<str>) -> Result<Option<Value>> {
        let row: Option<(String, String)> = sqlx::query_as(include_str!("../queries/get_value.sql"))
            .bind(key.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|(kind, value)| Value::decode(&kind, value)).transpose()
    }

    pub async fn put(&self, key: impl AsRef<str>, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        sqlx::query(include_str!("../queries/put_value.sql"))
            .bind(key.as_ref())
            .bind(value.kind())
            .bind(value.to_string())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    pub async fn contains(&self, key: impl AsRef<str>) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Returns `true` if a value was removed.
    pub async fn delete(&self, key: impl AsRef<str>) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_value.sql"))
            .bind(key.as_ref())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_text(&self, key: impl AsRef<str>) -> Result<Option<String>> {
        match self.get(key).await? {
            None => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text)),
            Some(_) => exn::bail!(ErrorKind::InvalidData("expected a text value")),
        }
    }

    pub async fn get_integer(&self, key: impl AsRef<str>) -> Result<Option<i64>> {
        match self.get(key).await? {
            None => Ok(None),
            Some(Value::Integer(n)) => Ok(Some(n)),
            Some(_) => exn::bail!(ErrorKind::InvalidData("expected an integer value")),
        }
    }

    pub async fn get_real(&self, key: impl AsRef<str>) -> Result<Option<f64>> {
        match self.get(key).await? {
            None => Ok(None),
            Some(Value::Real(n)) => Ok(Some(n)),
            Some(_) => exn::bail!(ErrorKind::InvalidData("expected a real value")),
        }
    }
}
