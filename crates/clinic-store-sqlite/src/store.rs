//! The SQLite implementation of [`SampleStore`].

use std::path::Path;

use chrono::Utc;
use clinic_core::{
  sample::StoredSample,
  store::{LIST_KEYS_LIMIT, SampleStore},
};
use rusqlite::OptionalExtension as _;
use tracing::debug;

use crate::{
  Error, Result,
  encode::{decode_record, encode_dt, encode_record},
  schema::SCHEMA,
};

/// A sample store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  page_limit:      usize,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, page_limit: LIST_KEYS_LIMIT };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, page_limit: LIST_KEYS_LIMIT };
    store.init_schema().await?;
    Ok(store)
  }

  /// Lower the number of keys `list_keys` will return.
  pub fn with_page_limit(mut self, page_limit: usize) -> Self {
    self.page_limit = page_limit;
    self
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
}

impl SampleStore for SqliteStore {
  type Error = Error;

  async fn get(&self, key: &str) -> Result<Option<StoredSample>> {
    let key_owned = key.to_owned();
    let json: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT record_json FROM samples WHERE key = ?1",
            rusqlite::params![key_owned],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    json.map(|j| decode_record(key, &j)).transpose()
  }

  async fn put(&self, key: &str, record: StoredSample) -> Result<()> {
    let key_owned = key.to_owned();
    let json = encode_record(&record)?;
    let at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO samples (key, record_json, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE SET
             record_json = excluded.record_json,
             updated_at  = excluded.updated_at",
          rusqlite::params![key_owned, json, at],
        )?;
        Ok(())
      })
      .await?;

    debug!(key, "sample written");
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<()> {
    let key_owned = key.to_owned();
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM samples WHERE key = ?1", rusqlite::params![key_owned])?)
      })
      .await?;

    debug!(key, removed, "sample deleted");
    Ok(())
  }

  async fn list_keys(&self) -> Result<Vec<String>> {
    let limit = self.page_limit;
    // One extra row tells "exactly at the limit" apart from "beyond it".
    let fetch = i64::try_from(limit.saturating_add(1)).unwrap_or(i64::MAX);

    let keys: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare("SELECT key FROM samples ORDER BY key LIMIT ?1")?;
        let keys = stmt
          .query_map(rusqlite::params![fetch], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
      })
      .await?;

    if keys.len() > limit {
      return Err(clinic_core::Error::TooManyRecords { limit }.into());
    }
    Ok(keys)
  }
}
