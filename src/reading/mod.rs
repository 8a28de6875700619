//! Currently-reading widget data: a single JSON record cached with a
//! stale-while-revalidate protocol.
//!
//! - `read_cached` serves the stored value instantly (no visible loading)
//! - `refresh` fetches, validates, and replaces the record
//! - the widget paints cached-or-fallback first and repaints on change

mod cache;
mod types;
pub mod widget;

pub use cache::{ReadingCache, DEFAULT_TTL_MINUTES, READING_CACHE_KEY};
pub use types::{ApiReading, Reading, StoredReading};
