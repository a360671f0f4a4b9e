//! The `SampleStore` trait for key-value sample persistence.
//!
//! The trait is implemented by storage backends (e.g. `clinic-store-sqlite`
//! and [`crate::memory::MemoryStore`]). The mutation engine depends on this
//! abstraction only.

use std::future::Future;

use crate::sample::StoredSample;

/// Maximum number of keys a single [`SampleStore::list_keys`] call returns.
/// Listing beyond it is unsupported, not silently truncated.
pub const LIST_KEYS_LIMIT: usize = 1000;

/// Abstraction over an opaque key → record store.
///
/// Writes are whole-record: `put` replaces everything stored under the key.
/// There is no concurrency control; concurrent writers to the same key are
/// last-write-wins.
pub trait SampleStore: Send + Sync {
  /// Backend error; must convert into a core error so the mutation engine
  /// can surface it.
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  /// Fetch the record under `key`. Returns `None` if absent.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<StoredSample>, Self::Error>> + Send + 'a;

  /// Create or replace the record under `key`.
  fn put<'a>(
    &'a self,
    key: &'a str,
    record: StoredSample,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove the record under `key`. Deleting an absent key is not an error.
  fn delete<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// All keys in ascending order.
  ///
  /// Fails with [`crate::Error::TooManyRecords`] when the store holds more
  /// than [`LIST_KEYS_LIMIT`] records.
  fn list_keys(&self) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;
}
