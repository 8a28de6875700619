//! Types for the currently-reading payload.
//!
//! The wire type matches the serverless endpoint's camelCase JSON and is
//! kept separate from the domain type, which is what gets cached and
//! displayed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The book currently being read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
  pub title: String,
  pub author: String,
  pub url: Option<String>,
  pub cover_image: Option<String>,
  pub last_updated: Option<String>,
}

/// Payload shape of the reading endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiReading {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub author: String,
  pub url: Option<String>,
  #[serde(rename = "coverImage")]
  pub cover_image: Option<String>,
  #[serde(rename = "lastUpdated")]
  pub last_updated: Option<String>,
}

impl ApiReading {
  pub fn into_reading(self) -> Reading {
    Reading {
      title: self.title,
      author: self.author,
      url: self.url,
      cover_image: self.cover_image,
      last_updated: self.last_updated,
    }
  }
}

/// The persisted cache record: the value plus when it was stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReading {
  pub data: Reading,
  pub stored_at: DateTime<Utc>,
}
