//! [`MemoryStore`], an in-process [`SampleStore`] for tests and embedding.

use std::{
  collections::BTreeMap,
  sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicUsize, Ordering},
  },
};

use crate::{
  Error, Result,
  sample::StoredSample,
  store::{LIST_KEYS_LIMIT, SampleStore},
};

/// A [`SampleStore`] holding records in a `BTreeMap`.
///
/// Cloning is cheap and clones share the same records.
#[derive(Debug, Clone)]
pub struct MemoryStore {
  records:    Arc<Mutex<BTreeMap<String, StoredSample>>>,
  writes:     Arc<AtomicUsize>,
  page_limit: usize,
}

impl Default for MemoryStore {
  fn default() -> Self { Self::new() }
}

impl MemoryStore {
  pub fn new() -> Self { Self::with_page_limit(LIST_KEYS_LIMIT) }

  /// A store whose `list_keys` fails beyond `page_limit` records.
  pub fn with_page_limit(page_limit: usize) -> Self {
    Self {
      records: Arc::default(),
      writes: Arc::default(),
      page_limit,
    }
  }

  /// Number of `put` and `delete` calls served so far.
  pub fn writes(&self) -> usize { self.writes.load(Ordering::SeqCst) }

  pub fn len(&self) -> usize { self.lock().map(|r| r.len()).unwrap_or(0) }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, StoredSample>>> {
    self
      .records
      .lock()
      .map_err(|_| Error::InvalidOperation("memory store lock poisoned".into()))
  }
}

impl SampleStore for MemoryStore {
  type Error = Error;

  async fn get(&self, key: &str) -> Result<Option<StoredSample>> {
    Ok(self.lock()?.get(key).cloned())
  }

  async fn put(&self, key: &str, record: StoredSample) -> Result<()> {
    self.lock()?.insert(key.to_owned(), record);
    self.writes.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<()> {
    self.lock()?.remove(key);
    self.writes.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  async fn list_keys(&self) -> Result<Vec<String>> {
    let records = self.lock()?;
    if records.len() > self.page_limit {
      return Err(Error::TooManyRecords { limit: self.page_limit });
    }
    Ok(records.keys().cloned().collect())
  }
}
