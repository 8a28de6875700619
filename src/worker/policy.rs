//! Caching policy: which responses may be stored, and where navigations
//! fall back when everything else fails.

use crate::net::{AssetRequest, FetchedResponse, ResponseKind};

/// Rules the request handler consults before committing anything.
#[derive(Debug, Clone)]
pub struct CachePolicy {
  /// Site-relative path of the document served to offline navigations.
  /// Also the one HTML document the dynamic cache is allowed to hold.
  pub offline_fallback: String,
  /// Whether opaque (cross-origin) responses may be committed.
  pub cache_opaque: bool,
}

impl Default for CachePolicy {
  fn default() -> Self {
    Self {
      offline_fallback: "/404.html".to_string(),
      cache_opaque: false,
    }
  }
}

impl CachePolicy {
  /// Whether a network response is sound enough to store.
  pub fn is_cacheable_response(&self, response: &FetchedResponse) -> bool {
    if !response.is_ok() {
      return false;
    }
    response.kind == ResponseKind::Basic || self.cache_opaque
  }

  /// Whether the runtime cache may hold an entry for this request.
  ///
  /// HTML documents are excluded so navigations always prefer fresh network
  /// content; the offline fallback document is the single exception.
  pub fn allows_runtime_caching(&self, request: &AssetRequest) -> bool {
    let path = request.path();
    !(path.ends_with(".html") && path != self.offline_fallback)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use url::Url;

  fn request(path: &str) -> AssetRequest {
    let url = Url::parse("https://example.com").unwrap().join(path).unwrap();
    AssetRequest::get(url)
  }

  #[test]
  fn test_non_200_is_not_cacheable() {
    let policy = CachePolicy::default();
    assert!(!policy.is_cacheable_response(&FetchedResponse::ok("x").with_status(404)));
    assert!(!policy.is_cacheable_response(&FetchedResponse::ok("x").with_status(301)));
    assert!(policy.is_cacheable_response(&FetchedResponse::ok("x")));
  }

  #[test]
  fn test_opaque_respects_policy_knob() {
    let opaque = FetchedResponse::ok("x").with_kind(ResponseKind::Opaque);

    let strict = CachePolicy::default();
    assert!(!strict.is_cacheable_response(&opaque));

    let permissive = CachePolicy {
      cache_opaque: true,
      ..CachePolicy::default()
    };
    assert!(permissive.is_cacheable_response(&opaque));
  }

  #[test]
  fn test_html_documents_are_excluded() {
    let policy = CachePolicy::default();
    assert!(!policy.allows_runtime_caching(&request("/photos.html")));
    assert!(policy.allows_runtime_caching(&request("/styles.css")));
    assert!(policy.allows_runtime_caching(&request("/fav/favicon.svg")));
  }

  #[test]
  fn test_offline_fallback_is_cacheable_html() {
    let policy = CachePolicy::default();
    assert!(policy.allows_runtime_caching(&request("/404.html")));
  }
}
