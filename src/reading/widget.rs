//! Display protocol for the currently-reading line.
//!
//! Paint first, revalidate second: the cached value (or the hardcoded
//! fallback book) is shown immediately, then the network is consulted and
//! the line is replaced only if something actually changed.

use crate::net::Fetcher;
use crate::store::KvStore;

use super::cache::ReadingCache;
use super::types::Reading;

/// The book shown when nothing has ever been cached.
pub fn fallback() -> Reading {
  Reading {
    title: "Fountainhead".to_string(),
    author: "Ayn Rand".to_string(),
    url: None,
    cover_image: None,
    last_updated: None,
  }
}

/// Render a reading as a display line.
pub fn format_line(reading: &Reading) -> String {
  format!("📚 {} by {}", reading.title, reading.author)
}

/// Run the paint-then-revalidate sequence.
///
/// Returns the immediately displayable value and, when the refresh yields
/// something different from what was painted, the replacement.
pub async fn paint_and_revalidate<K: KvStore, F: Fetcher>(
  cache: &ReadingCache<K, F>,
) -> (Reading, Option<Reading>) {
  let painted = cache.read_cached().unwrap_or_else(fallback);
  let repaint = cache.refresh().await.filter(|fresh| *fresh != painted);
  (painted, repaint)
}
