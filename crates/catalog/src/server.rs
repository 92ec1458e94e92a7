//! Persistent server identity.

use crate::error::{ErrorKind, Result};
use crate::kv::KeyValueStore;
use exn::OptionExt;
use serde::{Deserialize, Serialize};
use tracing::instrument;

const KEY_SERVER_ID: &str = "server.id";
const KEY_SERVER_NAME: &str = "server.name";

/// How clients identify this server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Random 64-bit number as hex, fixed on first start.
    pub id: String,
    /// Defaults to the first four characters of the id; can be renamed.
    pub name: String,
    pub version: String,
}

impl KeyValueStore {
    /// Write a fresh server identity unless one already exists.
    #[instrument(skip_all)]
    pub async fn init_server_info(&self) -> Result<ServerInfo> {
        if !self.contains(KEY_SERVER_ID).await? {
            let id = format!("{:016x}", rand::random::<u64>());
            let name: String = id.chars().take(4).collect();
            self.put(KEY_SERVER_ID, id.as_str()).await?;
            self.put(KEY_SERVER_NAME, name.as_str()).await?;
            tracing::info!(%id, %name, "Initialised server identity");
        }
        self.server_info().await
    }

    pub async fn server_info(&self) -> Result<ServerInfo> {
        let id = self.get_text(KEY_SERVER_ID).await?.ok_or_raise(|| ErrorKind::NotInitialised)?;
        let name = self.get_text(KEY_SERVER_NAME).await?.ok_or_raise(|| ErrorKind::NotInitialised)?;
        Ok(ServerInfo {
            id,
            name,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    pub async fn rename_server(&self, name: impl AsRef<str>) -> Result<ServerInfo> {
        let mut info = self.server_info().await?;
        self.put(KEY_SERVER_NAME, name.as_ref()).await?;
        info.name = name.as_ref().to_string();
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn store() -> KeyValueStore {
        KeyValueStore::from(&Database::connect_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_uninitialised() {
        let err = store().await.server_info().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotInitialised));
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let kv = store().await;
        let first = kv.init_server_info().await.unwrap();
        assert_eq!(first.id.len(), 16);
        assert!(first.id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(first.name, first.id[..4]);
        assert_eq!(kv.init_server_info().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_rename_keeps_id() {
        let kv = store().await;
        let original = kv.init_server_info().await.unwrap();
        let renamed = kv.rename_server("attic").await.unwrap();
        assert_eq!(renamed.id, original.id);
        assert_eq!(kv.server_info().await.unwrap().name, "attic");
    }
}
