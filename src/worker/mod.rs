//! Generational asset cache with offline support.
//!
//! Mirrors the site shell per versioned generation:
//! - install: fetch the whole manifest and commit it atomically
//! - activate: prune every store that isn't the current generation
//! - handle: cache-first request interception with an offline fallback
//!   for navigations

mod generation;
mod handler;
mod policy;

pub use generation::Generation;
pub use handler::{resolve, NetworkOutcome, Resolution};
pub use policy::CachePolicy;

use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::net::{AssetRequest, FetchedResponse, Fetcher};
use crate::store::{CacheStore, CachedEntry};

/// The asset cache worker: one current generation, one store, one fetcher.
pub struct AssetWorker<S: CacheStore, F: Fetcher> {
  store: Arc<S>,
  fetcher: Arc<F>,
  base: Url,
  generation: Generation,
  policy: CachePolicy,
}

impl<S: CacheStore, F: Fetcher> AssetWorker<S, F> {
  pub fn new(
    store: Arc<S>,
    fetcher: Arc<F>,
    base: Url,
    generation: Generation,
    policy: CachePolicy,
  ) -> Self {
    Self {
      store,
      fetcher,
      base,
      generation,
      policy,
    }
  }

  /// Fetch and commit the whole manifest for this generation.
  ///
  /// All-or-nothing: responses are staged in memory and committed in one
  /// batch, so a generation with a missing asset never becomes visible and
  /// the previous generation keeps serving.
  pub async fn install(&self) -> Result<()> {
    let requests = self
      .generation
      .manifest
      .iter()
      .map(|path| self.site_request(path))
      .collect::<Result<Vec<_>>>()?;

    let fetches = requests.iter().map(|request| async move {
      let response = self
        .fetcher
        .fetch(request)
        .await
        .map_err(|e| eyre!("Failed to fetch manifest asset {}: {}", request.url, e))?;

      if !self.policy.is_cacheable_response(&response) {
        return Err(eyre!(
          "Manifest asset {} returned status {}",
          request.url,
          response.status
        ));
      }

      Ok((request.clone(), response))
    });

    let entries = try_join_all(fetches).await?;
    self.store.put_all(&self.generation.store_name(), &entries)?;

    info!(
      generation = %self.generation.version,
      assets = entries.len(),
      "installed cache generation"
    );

    Ok(())
  }

  /// Promote this generation: delete every other store.
  pub fn activate(&self) -> Result<()> {
    let current = self.generation.store_name();
    self.store.open(&current)?;

    for name in self.store.list()? {
      if name != current {
        info!(store = %name, "deleting stale cache generation");
        self.store.delete(&name)?;
      }
    }

    Ok(())
  }

  /// Answer one request through the cache pipeline.
  ///
  /// Only same-origin GET requests are intercepted; everything else goes
  /// straight to the network untouched.
  pub async fn handle(&self, request: &AssetRequest) -> Result<FetchedResponse> {
    if !self.intercepts(request) {
      return self.fetcher.fetch(request).await;
    }

    if let Some(entry) = self.lookup(request) {
      debug!(url = %request.url, "cache hit");
      return Ok(entry.response);
    }

    let (outcome, network_err) = match self.fetcher.fetch(request).await {
      Ok(response) => (NetworkOutcome::Response(response), None),
      Err(err) => (NetworkOutcome::Unreachable, Some(err)),
    };

    match resolve(request, None, Some(outcome), &self.policy) {
      Resolution::Cached(response) => Ok(response),
      Resolution::Network { response, store } => {
        if store {
          self.commit(request, &response);
        }
        Ok(response)
      }
      Resolution::OfflineFallback => match self.offline_fallback() {
        Some(response) => {
          debug!(url = %request.url, "serving offline fallback");
          Ok(response)
        }
        None => Err(
          network_err.unwrap_or_else(|| eyre!("Offline fallback missing from cache")),
        ),
      },
      Resolution::Unavailable => Err(network_err.unwrap_or_else(|| {
        eyre!("Failed to fetch {} and no cached copy exists", request.url)
      })),
    }
  }

  fn intercepts(&self, request: &AssetRequest) -> bool {
    request.is_get() && request.url.origin() == self.base.origin()
  }

  /// Cache lookup; storage failures degrade to a miss.
  fn lookup(&self, request: &AssetRequest) -> Option<CachedEntry> {
    match self
      .store
      .match_request(&self.generation.store_name(), request)
    {
      Ok(hit) => hit,
      Err(err) => {
        warn!(url = %request.url, "cache read failed: {}", err);
        None
      }
    }
  }

  /// Opportunistic cache write; failures are logged and swallowed.
  fn commit(&self, request: &AssetRequest, response: &FetchedResponse) {
    if let Err(err) = self
      .store
      .put(&self.generation.store_name(), request, response)
    {
      warn!(url = %request.url, "cache write failed: {}", err);
    }
  }

  fn offline_fallback(&self) -> Option<FetchedResponse> {
    let url = self.base.join(&self.policy.offline_fallback).ok()?;
    self
      .lookup(&AssetRequest::navigate(url))
      .map(|entry| entry.response)
  }

  fn site_request(&self, path: &str) -> Result<AssetRequest> {
    let url = self
      .base
      .join(path)
      .map_err(|e| eyre!("Invalid manifest path {}: {}", path, e))?;
    Ok(AssetRequest::get(url))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::net::{MockFetcher, ResponseKind};
  use crate::store::MemoryStore;

  const ORIGIN: &str = "https://example.com";

  fn base() -> Url {
    Url::parse(ORIGIN).unwrap()
  }

  fn get(path: &str) -> AssetRequest {
    AssetRequest::get(base().join(path).unwrap())
  }

  fn navigate(path: &str) -> AssetRequest {
    AssetRequest::navigate(base().join(path).unwrap())
  }

  fn shell_fetcher() -> MockFetcher {
    MockFetcher::new()
      .route("/", FetchedResponse::ok("<home>"))
      .route("/index.html", FetchedResponse::ok("<home>"))
      .route("/404.html", FetchedResponse::ok("<offline>"))
      .route("/styles.css", FetchedResponse::ok("body { }"))
  }

  fn shell_manifest() -> Vec<String> {
    ["/", "/index.html", "/404.html", "/styles.css"]
      .iter()
      .map(|s| s.to_string())
      .collect()
  }

  fn worker(store: MemoryStore, fetcher: MockFetcher, version: &str) -> AssetWorker<MemoryStore, MockFetcher> {
    AssetWorker::new(
      Arc::new(store),
      Arc::new(fetcher),
      base(),
      Generation::new(version, shell_manifest()),
      CachePolicy::default(),
    )
  }

  #[tokio::test]
  async fn test_installed_manifest_is_served_without_network() {
    let store = MemoryStore::new();
    let worker = worker(store, shell_fetcher(), "v1");

    worker.install().await.unwrap();
    worker.activate().unwrap();
    let installs = worker.fetcher.request_count();

    for path in shell_manifest() {
      let response = worker.handle(&get(&path)).await.unwrap();
      assert_eq!(response.status, 200);
    }

    // Every request answered from the store.
    assert_eq!(worker.fetcher.request_count(), installs);
  }

  #[tokio::test]
  async fn test_activation_prunes_previous_generation() {
    let store = MemoryStore::new();

    let v1 = worker(store.clone(), shell_fetcher(), "v1");
    v1.install().await.unwrap();
    v1.activate().unwrap();

    let v2 = worker(store.clone(), shell_fetcher(), "v2");
    v2.install().await.unwrap();
    v2.activate().unwrap();

    assert_eq!(store.list().unwrap(), vec!["offsite-cache-v2".to_string()]);
    assert_eq!(store.count("offsite-cache-v2").unwrap(), shell_manifest().len() as u64);
  }

  #[tokio::test]
  async fn test_failed_install_commits_nothing() {
    let store = MemoryStore::new();

    let v1 = worker(store.clone(), shell_fetcher(), "v1");
    v1.install().await.unwrap();
    v1.activate().unwrap();

    // v2's fetcher is missing /styles.css entirely.
    let broken = MockFetcher::new()
      .route("/", FetchedResponse::ok("<home>"))
      .route("/index.html", FetchedResponse::ok("<home>"))
      .route("/404.html", FetchedResponse::ok("<offline>"));
    let v2 = AssetWorker::new(
      Arc::new(store.clone()),
      Arc::new(broken),
      base(),
      Generation::new("v2", shell_manifest()),
      CachePolicy::default(),
    );

    assert!(v2.install().await.is_err());

    // Old generation untouched, new one absent.
    assert_eq!(store.list().unwrap(), vec!["offsite-cache-v1".to_string()]);
    assert_eq!(store.count("offsite-cache-v2").unwrap(), 0);
  }

  #[tokio::test]
  async fn test_install_rejects_error_statuses() {
    let store = MemoryStore::new();
    let fetcher = shell_fetcher().route("/styles.css", FetchedResponse::ok("gone").with_status(404));
    let worker = worker(store.clone(), fetcher, "v1");

    assert!(worker.install().await.is_err());
    assert_eq!(store.count("offsite-cache-v1").unwrap(), 0);
  }

  #[tokio::test]
  async fn test_offline_navigation_serves_fallback() {
    let store = MemoryStore::new();
    let installer = worker(store.clone(), shell_fetcher(), "v1");
    installer.install().await.unwrap();
    installer.activate().unwrap();

    // Same store, network gone.
    let offline = worker(store, MockFetcher::new(), "v1");
    let response = offline.handle(&navigate("/photos.html")).await.unwrap();

    assert_eq!(response.text(), "<offline>");
  }

  #[tokio::test]
  async fn test_offline_subresource_propagates_failure() {
    let store = MemoryStore::new();
    let installer = worker(store.clone(), shell_fetcher(), "v1");
    installer.install().await.unwrap();
    installer.activate().unwrap();

    let offline = worker(store, MockFetcher::new(), "v1");
    let result = offline.handle(&get("/fav/favicon.svg")).await;

    assert!(result.is_err());
  }

  #[tokio::test]
  async fn test_runtime_fetch_caches_assets_but_not_html() {
    let store = MemoryStore::new();
    let fetcher = shell_fetcher()
      .route("/gallery.js", FetchedResponse::ok("let g;"))
      .route("/photos.html", FetchedResponse::ok("<photos>"));
    let worker = worker(store, fetcher, "v1");
    worker.activate().unwrap();

    // Asset: second request comes from the cache.
    worker.handle(&get("/gallery.js")).await.unwrap();
    let after_first = worker.fetcher.request_count();
    worker.handle(&get("/gallery.js")).await.unwrap();
    assert_eq!(worker.fetcher.request_count(), after_first);

    // HTML document: fetched every time.
    worker.handle(&navigate("/photos.html")).await.unwrap();
    worker.handle(&navigate("/photos.html")).await.unwrap();
    assert_eq!(worker.fetcher.request_count(), after_first + 2);
  }

  #[tokio::test]
  async fn test_cross_origin_requests_bypass_the_cache() {
    let store = MemoryStore::new();
    let fetcher = MockFetcher::new().route("/widget.js", FetchedResponse::ok("w"));
    let worker = worker(store.clone(), fetcher, "v1");
    worker.activate().unwrap();

    let foreign = AssetRequest::get(Url::parse("https://cdn.example.net/widget.js").unwrap());
    worker.handle(&foreign).await.unwrap();
    worker.handle(&foreign).await.unwrap();

    // Fetched twice, nothing stored.
    assert_eq!(worker.fetcher.request_count(), 2);
    assert_eq!(store.count("offsite-cache-v1").unwrap(), 0);
  }

  #[tokio::test]
  async fn test_opaque_responses_follow_policy() {
    let opaque = FetchedResponse::ok("tracked").with_kind(ResponseKind::Opaque);

    let strict = worker(
      MemoryStore::new(),
      MockFetcher::new().route("/pixel.png", opaque.clone()),
      "v1",
    );
    strict.activate().unwrap();
    strict.handle(&get("/pixel.png")).await.unwrap();
    assert_eq!(strict.store.count("offsite-cache-v1").unwrap(), 0);

    let permissive = AssetWorker::new(
      Arc::new(MemoryStore::new()),
      Arc::new(MockFetcher::new().route("/pixel.png", opaque)),
      base(),
      Generation::new("v1", shell_manifest()),
      CachePolicy {
        cache_opaque: true,
        ..CachePolicy::default()
      },
    );
    permissive.activate().unwrap();
    permissive.handle(&get("/pixel.png")).await.unwrap();
    assert_eq!(permissive.store.count("offsite-cache-v1").unwrap(), 1);
  }
}
