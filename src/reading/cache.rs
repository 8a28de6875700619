//! Stale-while-revalidate cache for the currently-reading record.
//!
//! One slot, one fixed key, time-based expiry. `read_cached` never fails:
//! anything wrong with the stored record (missing, malformed, expired) is
//! treated as a miss and the record is purged. `refresh` only ever
//! overwrites the record on a fully successful fetch, so a failed refresh
//! can never blank out what the reader already sees.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::net::{AssetRequest, Fetcher};
use crate::store::KvStore;

use super::types::{ApiReading, Reading, StoredReading};

/// Fixed storage key for the reading record.
pub const READING_CACHE_KEY: &str = "reading-cache";

/// Default record lifetime.
pub const DEFAULT_TTL_MINUTES: i64 = 30;

/// Revalidating cache over the single reading endpoint.
pub struct ReadingCache<K: KvStore, F: Fetcher> {
  kv: Arc<K>,
  fetcher: Arc<F>,
  endpoint: Url,
  ttl: Duration,
}

impl<K: KvStore, F: Fetcher> ReadingCache<K, F> {
  pub fn new(kv: Arc<K>, fetcher: Arc<F>, endpoint: Url) -> Self {
    Self {
      kv,
      fetcher,
      endpoint,
      ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
    }
  }

  /// Set the record lifetime.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Read the cached record, if a fresh one exists.
  ///
  /// Expired and malformed records are purged on the way out. Storage
  /// failures degrade to a miss; this never returns an error.
  pub fn read_cached(&self) -> Option<Reading> {
    let raw = match self.kv.get(READING_CACHE_KEY) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(err) => {
        debug!("reading cache lookup failed: {}", err);
        return None;
      }
    };

    let record: StoredReading = match serde_json::from_str(&raw) {
      Ok(record) => record,
      Err(err) => {
        debug!("discarding malformed reading record: {}", err);
        self.purge();
        return None;
      }
    };

    if !self.is_fresh(record.stored_at) {
      debug!("reading record expired");
      self.purge();
      return None;
    }

    Some(record.data)
  }

  /// Fetch the endpoint and, on success, replace the stored record.
  ///
  /// Returns `None` on HTTP failure, network failure, or a payload without
  /// a title; the existing record is left untouched in every failure case.
  pub async fn refresh(&self) -> Option<Reading> {
    let request = AssetRequest::get(self.endpoint.clone());

    let response = match self.fetcher.fetch(&request).await {
      Ok(response) => response,
      Err(err) => {
        debug!("reading refresh failed: {}", err);
        return None;
      }
    };

    if !response.is_ok() {
      debug!(status = response.status, "reading endpoint returned an error");
      return None;
    }

    let api: ApiReading = match serde_json::from_slice(&response.body) {
      Ok(api) => api,
      Err(err) => {
        debug!("reading payload did not parse: {}", err);
        return None;
      }
    };

    if api.title.trim().is_empty() {
      debug!("reading payload has no title, keeping previous record");
      return None;
    }

    let reading = api.into_reading();
    self.persist(&reading);

    Some(reading)
  }

  fn is_fresh(&self, stored_at: DateTime<Utc>) -> bool {
    Utc::now() - stored_at < self.ttl
  }

  /// Overwrite the stored record; a storage failure only costs the cache.
  fn persist(&self, reading: &Reading) {
    let record = StoredReading {
      data: reading.clone(),
      stored_at: Utc::now(),
    };

    match serde_json::to_string(&record) {
      Ok(raw) => {
        if let Err(err) = self.kv.set(READING_CACHE_KEY, &raw) {
          warn!("failed to persist reading record: {}", err);
        }
      }
      Err(err) => warn!("failed to serialize reading record: {}", err),
    }
  }

  fn purge(&self) {
    if let Err(err) = self.kv.remove(READING_CACHE_KEY) {
      debug!("failed to purge reading record: {}", err);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::net::{FetchedResponse, MockFetcher};
  use crate::store::MemoryKv;

  fn endpoint() -> Url {
    Url::parse("https://example.com/api/reading").unwrap()
  }

  fn dune_json() -> String {
    serde_json::json!({
      "title": "Dune",
      "author": "Frank Herbert"
    })
    .to_string()
  }

  fn cache_with(kv: MemoryKv, fetcher: MockFetcher) -> ReadingCache<MemoryKv, MockFetcher> {
    ReadingCache::new(Arc::new(kv), Arc::new(fetcher), endpoint())
  }

  fn seed_record(kv: &MemoryKv, title: &str, age: Duration) {
    let record = StoredReading {
      data: Reading {
        title: title.to_string(),
        author: "Frank Herbert".to_string(),
        url: None,
        cover_image: None,
        last_updated: None,
      },
      stored_at: Utc::now() - age,
    };
    kv.set(READING_CACHE_KEY, &serde_json::to_string(&record).unwrap())
      .unwrap();
  }

  #[tokio::test]
  async fn test_refresh_persists_and_read_cached_returns_it() {
    let kv = MemoryKv::new();
    let fetcher = MockFetcher::new().route("/api/reading", FetchedResponse::ok(dune_json()));
    let cache = cache_with(kv.clone(), fetcher);

    assert!(cache.read_cached().is_none());

    let fresh = cache.refresh().await.unwrap();
    assert_eq!(fresh.title, "Dune");

    let cached = cache.read_cached().unwrap();
    assert_eq!(cached.title, "Dune");
    assert_eq!(cached.author, "Frank Herbert");
  }

  #[test]
  fn test_record_within_ttl_is_served() {
    let kv = MemoryKv::new();
    seed_record(&kv, "Dune", Duration::minutes(29));
    let cache = cache_with(kv, MockFetcher::new());

    assert_eq!(cache.read_cached().unwrap().title, "Dune");
  }

  #[test]
  fn test_expired_record_is_purged() {
    let kv = MemoryKv::new();
    seed_record(&kv, "Dune", Duration::minutes(31));
    let cache = cache_with(kv.clone(), MockFetcher::new());

    assert!(cache.read_cached().is_none());
    // Purged, not just skipped.
    assert!(kv.get(READING_CACHE_KEY).unwrap().is_none());
  }

  #[test]
  fn test_malformed_record_is_purged() {
    let kv = MemoryKv::new();
    kv.set(READING_CACHE_KEY, "not json at all").unwrap();
    let cache = cache_with(kv.clone(), MockFetcher::new());

    assert!(cache.read_cached().is_none());
    assert!(kv.get(READING_CACHE_KEY).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_refresh_without_title_keeps_previous_record() {
    let kv = MemoryKv::new();
    seed_record(&kv, "Dune", Duration::minutes(1));
    let before = kv.get(READING_CACHE_KEY).unwrap();

    let payload = serde_json::json!({"author": "Nobody"}).to_string();
    let fetcher = MockFetcher::new().route("/api/reading", FetchedResponse::ok(payload));
    let cache = cache_with(kv.clone(), fetcher);

    assert!(cache.refresh().await.is_none());
    assert_eq!(kv.get(READING_CACHE_KEY).unwrap(), before);
  }

  #[tokio::test]
  async fn test_refresh_http_error_keeps_previous_record() {
    let kv = MemoryKv::new();
    seed_record(&kv, "Dune", Duration::minutes(1));

    let fetcher = MockFetcher::new()
      .route("/api/reading", FetchedResponse::ok("oops").with_status(500));
    let cache = cache_with(kv.clone(), fetcher);

    assert!(cache.refresh().await.is_none());
    assert_eq!(cache.read_cached().unwrap().title, "Dune");
  }

  #[tokio::test]
  async fn test_refresh_network_failure_keeps_previous_record() {
    let kv = MemoryKv::new();
    seed_record(&kv, "Dune", Duration::minutes(1));

    let cache = cache_with(kv.clone(), MockFetcher::new());

    assert!(cache.refresh().await.is_none());
    assert_eq!(cache.read_cached().unwrap().title, "Dune");
  }

  #[tokio::test]
  async fn test_refresh_overwrites_stale_record() {
    let kv = MemoryKv::new();
    seed_record(&kv, "Fountainhead", Duration::minutes(45));

    let fetcher = MockFetcher::new().route("/api/reading", FetchedResponse::ok(dune_json()));
    let cache = cache_with(kv, fetcher);

    let fresh = cache.refresh().await.unwrap();
    assert_eq!(fresh.title, "Dune");
    assert_eq!(cache.read_cached().unwrap().title, "Dune");
  }
}
