use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::worker::{CachePolicy, Generation};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub site: SiteConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub reading: ReadingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
  /// Origin of the mirrored site (e.g. "https://example.com").
  /// Requests outside this origin bypass the cache entirely.
  pub origin: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Generation version; bump it to force a full re-mirror on next sync
  pub version: String,
  /// Site-relative paths precached by `sync`
  pub manifest: Vec<String>,
  /// Document served to offline navigations
  pub offline_fallback: String,
  /// Whether opaque (cross-origin) responses may be cached
  pub cache_opaque: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      version: "v2".to_string(),
      manifest: default_manifest(),
      offline_fallback: "/404.html".to_string(),
      cache_opaque: false,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
  /// Site-relative path of the reading endpoint
  pub endpoint: String,
  /// Minutes before the cached record expires
  pub ttl_minutes: i64,
}

impl Default for ReadingConfig {
  fn default() -> Self {
    Self {
      endpoint: "/api/reading".to_string(),
      ttl_minutes: crate::reading::DEFAULT_TTL_MINUTES,
    }
  }
}

/// The site's shell: pages, styles, scripts, shared components, favicons.
fn default_manifest() -> Vec<String> {
  [
    "/",
    "/index.html",
    "/photos.html",
    "/bookshelf.html",
    "/404.html",
    "/styles/critical.css",
    "/styles/gallery.css",
    "/styles.css",
    "/js/bundle.js",
    "/js/gallery.js",
    "/js/bookshelf.js",
    "/components/header.html",
    "/components/footer.html",
    "/components/button.html",
    "/components/card.html",
    "/fav/favicon.svg",
    "/fav/favicon-96x96.png",
    "/fav/apple-touch-icon.png",
    "/fav/site.webmanifest",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./offsite.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/offsite/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/offsite/config.yaml\n\
                 with at least a `site.origin` entry."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("offsite.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("offsite").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// The site origin as a URL.
  pub fn base_url(&self) -> Result<Url> {
    Url::parse(&self.site.origin)
      .map_err(|e| eyre!("Invalid site origin {}: {}", self.site.origin, e))
  }

  /// The configured asset generation.
  pub fn generation(&self) -> Generation {
    Generation::new(self.cache.version.clone(), self.cache.manifest.clone())
  }

  /// The configured caching policy.
  pub fn policy(&self) -> CachePolicy {
    CachePolicy {
      offline_fallback: self.cache.offline_fallback.clone(),
      cache_opaque: self.cache.cache_opaque,
    }
  }

  /// Absolute URL of the reading endpoint.
  pub fn reading_endpoint(&self) -> Result<Url> {
    let base = self.base_url()?;
    base
      .join(&self.reading.endpoint)
      .map_err(|e| eyre!("Invalid reading endpoint {}: {}", self.reading.endpoint, e))
  }

  /// Lifetime of the cached reading record.
  pub fn reading_ttl(&self) -> chrono::Duration {
    chrono::Duration::minutes(self.reading.ttl_minutes)
  }
}
