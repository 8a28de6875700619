//! Storage traits shared by the SQLite backend and the in-memory fakes.

use chrono::{DateTime, Utc};
use color_eyre::Result;

use crate::net::{AssetRequest, FetchedResponse};

/// A captured response held in a cache store.
#[derive(Debug, Clone)]
pub struct CachedEntry {
  /// The stored response
  pub response: FetchedResponse,
  /// When the response was committed
  pub cached_at: DateTime<Utc>,
}

/// Named-store capability used by the asset cache.
///
/// Stores are keyed by name (one per cache generation); entries within a
/// store are keyed by the request's cache key.
pub trait CacheStore: Send + Sync {
  /// Create the named store if it does not exist yet.
  fn open(&self, name: &str) -> Result<()>;

  /// Names of all existing stores.
  fn list(&self) -> Result<Vec<String>>;

  /// Delete a store and everything in it.
  fn delete(&self, name: &str) -> Result<()>;

  /// Look up the entry for a request.
  fn match_request(&self, name: &str, request: &AssetRequest) -> Result<Option<CachedEntry>>;

  /// Store a single request/response pair, overwriting any prior entry.
  fn put(&self, name: &str, request: &AssetRequest, response: &FetchedResponse) -> Result<()>;

  /// Commit a batch of entries atomically: either every entry lands in the
  /// store or none do.
  fn put_all(&self, name: &str, entries: &[(AssetRequest, FetchedResponse)]) -> Result<()>;

  /// Number of entries in a store.
  fn count(&self, name: &str) -> Result<u64>;
}

/// String-keyed blob storage used by the revalidating data cache.
pub trait KvStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>>;

  fn set(&self, key: &str, value: &str) -> Result<()>;

  fn remove(&self, key: &str) -> Result<()>;
}
