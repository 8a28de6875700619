//! In-memory storage fakes.
//!
//! Cloned handles share state, so tests can hand one handle to a component
//! and inspect or seed the other.

use chrono::Utc;
use color_eyre::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::net::{AssetRequest, FetchedResponse};

use super::traits::{CacheStore, CachedEntry, KvStore};

/// In-memory named-store capability.
#[derive(Default, Clone)]
pub struct MemoryStore {
  stores: Arc<Mutex<HashMap<String, HashMap<String, CachedEntry>>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStore for MemoryStore {
  fn open(&self, name: &str) -> Result<()> {
    let mut stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
    stores.entry(name.to_string()).or_default();
    Ok(())
  }

  fn list(&self) -> Result<Vec<String>> {
    let stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
    let mut names: Vec<String> = stores.keys().cloned().collect();
    names.sort();
    Ok(names)
  }

  fn delete(&self, name: &str) -> Result<()> {
    let mut stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
    stores.remove(name);
    Ok(())
  }

  fn match_request(&self, name: &str, request: &AssetRequest) -> Result<Option<CachedEntry>> {
    let stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
    Ok(
      stores
        .get(name)
        .and_then(|entries| entries.get(&request.cache_key()))
        .cloned(),
    )
  }

  fn put(&self, name: &str, request: &AssetRequest, response: &FetchedResponse) -> Result<()> {
    let mut stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
    stores.entry(name.to_string()).or_default().insert(
      request.cache_key(),
      CachedEntry {
        response: response.clone(),
        cached_at: Utc::now(),
      },
    );
    Ok(())
  }

  fn put_all(&self, name: &str, entries: &[(AssetRequest, FetchedResponse)]) -> Result<()> {
    let mut stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
    let store = stores.entry(name.to_string()).or_default();
    for (request, response) in entries {
      store.insert(
        request.cache_key(),
        CachedEntry {
          response: response.clone(),
          cached_at: Utc::now(),
        },
      );
    }
    Ok(())
  }

  fn count(&self, name: &str) -> Result<u64> {
    let stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
    Ok(stores.get(name).map(|s| s.len() as u64).unwrap_or(0))
  }
}

/// In-memory key-value capability.
#[derive(Default, Clone)]
pub struct MemoryKv {
  entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKv {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KvStore for MemoryKv {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    entries.remove(key);
    Ok(())
  }
}
