//! Network fetch capability and the request/response model.
//!
//! Both cache components consume the same `Fetcher` trait. The real
//! implementation wraps reqwest; `MockFetcher` serves a fixed route table
//! for tests and offline demos.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use url::Url;

/// A boxed future, used to keep `Fetcher` object-safe without an
/// async-trait dependency.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How a request intends to use its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
  /// Loads a top-level page document.
  Navigate,
  /// Loads a subresource (image, script, stylesheet, JSON).
  Subresource,
}

/// A request for a site resource.
#[derive(Debug, Clone)]
pub struct AssetRequest {
  pub url: Url,
  pub method: reqwest::Method,
  pub mode: RequestMode,
}

impl AssetRequest {
  /// A plain GET subresource request.
  pub fn get(url: Url) -> Self {
    Self {
      url,
      method: reqwest::Method::GET,
      mode: RequestMode::Subresource,
    }
  }

  /// A GET request for a top-level page document.
  pub fn navigate(url: Url) -> Self {
    Self {
      url,
      method: reqwest::Method::GET,
      mode: RequestMode::Navigate,
    }
  }

  pub fn is_get(&self) -> bool {
    self.method == reqwest::Method::GET
  }

  pub fn is_navigation(&self) -> bool {
    self.mode == RequestMode::Navigate
  }

  pub fn path(&self) -> &str {
    self.url.path()
  }

  /// Stable storage key for this request.
  ///
  /// Keyed by method + URL; the request mode is deliberately excluded so a
  /// navigation and a subresource request for the same document share one
  /// cache entry.
  pub fn cache_key(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.method.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(self.url.as_str().as_bytes());
    hex::encode(hasher.finalize())
  }
}

/// Origin class of a fetched response.
///
/// `Opaque` marks responses that ended up cross-origin (e.g. after a
/// redirect); whether those may be cached is a policy decision, not a
/// property of the response itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
  Basic,
  Opaque,
}

/// A fully captured HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub kind: ResponseKind,
}

impl FetchedResponse {
  /// A 200 same-origin response with the given body.
  pub fn ok(body: impl Into<Vec<u8>>) -> Self {
    Self {
      status: 200,
      headers: Vec::new(),
      body: body.into(),
      kind: ResponseKind::Basic,
    }
  }

  pub fn with_status(mut self, status: u16) -> Self {
    self.status = status;
    self
  }

  pub fn with_kind(mut self, kind: ResponseKind) -> Self {
    self.kind = kind;
    self
  }

  pub fn is_ok(&self) -> bool {
    self.status == 200
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }

  /// Body as lossy UTF-8 text.
  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

/// Trait for the injected network capability.
pub trait Fetcher: Send + Sync {
  /// Perform the request and capture the full response.
  ///
  /// A returned error means the network itself failed (offline, DNS,
  /// connection refused); an HTTP error status is a successful fetch.
  fn fetch<'a>(&'a self, request: &'a AssetRequest) -> BoxFuture<'a, Result<FetchedResponse>>;
}

/// Real network fetcher backed by reqwest.
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

impl Fetcher for HttpFetcher {
  fn fetch<'a>(&'a self, request: &'a AssetRequest) -> BoxFuture<'a, Result<FetchedResponse>> {
    Box::pin(async move {
      let response = self
        .client
        .request(request.method.clone(), request.url.clone())
        .send()
        .await
        .map_err(|e| eyre!("Failed to fetch {}: {}", request.url, e))?;

      let status = response.status().as_u16();

      // A redirect off-origin makes the response opaque to the cache.
      let kind = if response.url().origin() == request.url.origin() {
        ResponseKind::Basic
      } else {
        ResponseKind::Opaque
      };

      let mut headers = Vec::new();
      for (name, value) in response.headers() {
        if let Ok(v) = value.to_str() {
          headers.push((name.to_string(), v.to_string()));
        }
      }

      let body = response
        .bytes()
        .await
        .map_err(|e| eyre!("Failed to read body of {}: {}", request.url, e))?
        .to_vec();

      Ok(FetchedResponse {
        status,
        headers,
        body,
        kind,
      })
    })
  }
}

/// Fetcher serving a fixed path-keyed route table.
///
/// Paths with no route behave like an unreachable network. Requests are
/// recorded so tests can assert which lookups actually hit the "network".
#[derive(Default)]
pub struct MockFetcher {
  routes: HashMap<String, FetchedResponse>,
  requests: Mutex<Vec<String>>,
}

impl MockFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a response for a path.
  pub fn route(mut self, path: &str, response: FetchedResponse) -> Self {
    self.routes.insert(path.to_string(), response);
    self
  }

  /// Paths fetched so far, in order.
  pub fn requested(&self) -> Vec<String> {
    self.requests.lock().map(|r| r.clone()).unwrap_or_default()
  }

  /// Total number of fetches performed.
  pub fn request_count(&self) -> usize {
    self.requests.lock().map(|r| r.len()).unwrap_or(0)
  }
}

impl Fetcher for MockFetcher {
  fn fetch<'a>(&'a self, request: &'a AssetRequest) -> BoxFuture<'a, Result<FetchedResponse>> {
    Box::pin(async move {
      if let Ok(mut log) = self.requests.lock() {
        log.push(request.path().to_string());
      }

      match self.routes.get(request.path()) {
        Some(response) => Ok(response.clone()),
        None => Err(eyre!("Network unreachable for {}", request.url)),
      }
    })
  }
}
