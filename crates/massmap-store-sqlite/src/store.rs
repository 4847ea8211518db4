//! [`SqliteStore`]: the SQLite implementation of [`KeyValueStore`].

use std::path::Path;

use massmap_core::preferences::KeyValueStore;
use rusqlite::OptionalExtension as _;
use serde_json::Value;

use crate::{Error, Result, schema::SCHEMA};

/// A preference store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Every stored key, sorted.
  pub async fn keys(&self) -> Result<Vec<String>> {
    let keys = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT key FROM prefs ORDER BY key")?;
        let keys = stmt
          .query_map([], |row| row.get(0))?
          .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
      })
      .await?;
    Ok(keys)
  }
}

impl KeyValueStore for SqliteStore {
  type Error = Error;

  async fn get(&self, key: &str) -> Result<Option<Value>> {
    let owned = key.to_string();
    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value_json FROM prefs WHERE key = ?1",
              rusqlite::params![owned],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|raw| {
        serde_json::from_str(&raw).map_err(|source| Error::CorruptValue {
          key: key.to_string(),
          source,
        })
      })
      .transpose()
  }

  async fn set(&self, key: &str, value: Value) -> Result<()> {
    let key = key.to_string();
    let json = serde_json::to_string(&value)?;
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO prefs (key, value_json) VALUES (?1, ?2)
           ON CONFLICT(key) DO UPDATE SET
             value_json = excluded.value_json,
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
          rusqlite::params![key, json],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<()> {
    let key = key.to_string();
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM prefs WHERE key = ?1", rusqlite::params![key])?)
      })
      .await?;
    tracing::debug!(removed, "removed preference");
    Ok(())
  }
}
