//! Pure decision core of the request handler.
//!
//! `resolve` turns what is known about a request (cache lookup result,
//! network outcome) into a `Resolution`; the async adapter in
//! [`super::AssetWorker`] performs the I/O on either side of it.

use crate::net::{AssetRequest, FetchedResponse};
use crate::store::CachedEntry;

use super::policy::CachePolicy;

/// What happened when the network was consulted.
#[derive(Debug, Clone)]
pub enum NetworkOutcome {
  /// The fetch completed (any HTTP status).
  Response(FetchedResponse),
  /// The fetch itself failed: offline, DNS, connection refused.
  Unreachable,
}

/// How to answer the request.
#[derive(Debug, Clone)]
pub enum Resolution {
  /// Serve the cached response untouched; no network involved.
  Cached(FetchedResponse),
  /// Serve the network response, committing a copy first when `store` is set.
  Network {
    response: FetchedResponse,
    store: bool,
  },
  /// Serve the cached offline-fallback document.
  OfflineFallback,
  /// Nothing to serve; the failure propagates to the caller.
  Unavailable,
}

/// Decide how to answer an intercepted request.
///
/// A cache hit wins unconditionally (generation-based caches have no
/// per-entry freshness). On a miss the network response is served as-is;
/// whether a copy is committed depends on the policy. When the network is
/// unreachable only navigations get the offline fallback.
pub fn resolve(
  request: &AssetRequest,
  cached: Option<CachedEntry>,
  network: Option<NetworkOutcome>,
  policy: &CachePolicy,
) -> Resolution {
  if let Some(entry) = cached {
    return Resolution::Cached(entry.response);
  }

  match network {
    Some(NetworkOutcome::Response(response)) => {
      let store =
        policy.is_cacheable_response(&response) && policy.allows_runtime_caching(request);
      Resolution::Network { response, store }
    }
    Some(NetworkOutcome::Unreachable) | None => {
      if request.is_navigation() {
        Resolution::OfflineFallback
      } else {
        Resolution::Unavailable
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use url::Url;

  fn request(path: &str) -> AssetRequest {
    let url = Url::parse("https://example.com").unwrap().join(path).unwrap();
    AssetRequest::get(url)
  }

  fn navigation(path: &str) -> AssetRequest {
    let url = Url::parse("https://example.com").unwrap().join(path).unwrap();
    AssetRequest::navigate(url)
  }

  fn entry(body: &str) -> CachedEntry {
    CachedEntry {
      response: FetchedResponse::ok(body),
      cached_at: Utc::now(),
    }
  }

  #[test]
  fn test_cache_hit_wins_without_network() {
    let resolution = resolve(
      &request("/styles.css"),
      Some(entry("cached")),
      None,
      &CachePolicy::default(),
    );

    match resolution {
      Resolution::Cached(response) => assert_eq!(response.text(), "cached"),
      other => panic!("expected cached resolution, got {:?}", other),
    }
  }

  #[test]
  fn test_network_response_for_asset_is_stored() {
    let resolution = resolve(
      &request("/styles.css"),
      None,
      Some(NetworkOutcome::Response(FetchedResponse::ok("fresh"))),
      &CachePolicy::default(),
    );

    match resolution {
      Resolution::Network { store, .. } => assert!(store),
      other => panic!("expected network resolution, got {:?}", other),
    }
  }

  #[test]
  fn test_network_response_for_html_is_served_not_stored() {
    let resolution = resolve(
      &navigation("/photos.html"),
      None,
      Some(NetworkOutcome::Response(FetchedResponse::ok("<html>"))),
      &CachePolicy::default(),
    );

    match resolution {
      Resolution::Network { response, store } => {
        assert_eq!(response.text(), "<html>");
        assert!(!store);
      }
      other => panic!("expected network resolution, got {:?}", other),
    }
  }

  #[test]
  fn test_error_status_is_served_not_stored() {
    let resolution = resolve(
      &request("/styles.css"),
      None,
      Some(NetworkOutcome::Response(
        FetchedResponse::ok("gone").with_status(404),
      )),
      &CachePolicy::default(),
    );

    match resolution {
      Resolution::Network { store, .. } => assert!(!store),
      other => panic!("expected network resolution, got {:?}", other),
    }
  }

  #[test]
  fn test_unreachable_navigation_falls_back() {
    let resolution = resolve(
      &navigation("/photos.html"),
      None,
      Some(NetworkOutcome::Unreachable),
      &CachePolicy::default(),
    );

    assert!(matches!(resolution, Resolution::OfflineFallback));
  }

  #[test]
  fn test_unreachable_subresource_propagates() {
    let resolution = resolve(
      &request("/fav/favicon.svg"),
      None,
      Some(NetworkOutcome::Unreachable),
      &CachePolicy::default(),
    );

    assert!(matches!(resolution, Resolution::Unavailable));
  }
}
