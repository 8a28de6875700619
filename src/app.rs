//! Command implementations: wires the configuration, the SQLite store, and
//! the HTTP fetcher into the two cache components.

use color_eyre::Result;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::net::{AssetRequest, HttpFetcher};
use crate::reading::{widget, ReadingCache, StoredReading, READING_CACHE_KEY};
use crate::store::{CacheStore, KvStore, SqliteStore};
use crate::worker::AssetWorker;

pub struct App {
  config: Config,
  store: Arc<SqliteStore>,
  fetcher: Arc<HttpFetcher>,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let store = Arc::new(SqliteStore::open()?);
    let fetcher = Arc::new(HttpFetcher::new()?);

    Ok(Self {
      config,
      store,
      fetcher,
    })
  }

  fn worker(&self) -> Result<AssetWorker<SqliteStore, HttpFetcher>> {
    Ok(AssetWorker::new(
      Arc::clone(&self.store),
      Arc::clone(&self.fetcher),
      self.config.base_url()?,
      self.config.generation(),
      self.config.policy(),
    ))
  }

  fn reading_cache(&self) -> Result<ReadingCache<SqliteStore, HttpFetcher>> {
    Ok(
      ReadingCache::new(
        Arc::clone(&self.store),
        Arc::clone(&self.fetcher),
        self.config.reading_endpoint()?,
      )
      .with_ttl(self.config.reading_ttl()),
    )
  }

  /// Install the configured generation and prune old ones.
  pub async fn sync(&self) -> Result<()> {
    let worker = self.worker()?;
    worker.install().await?;
    worker.activate()?;

    let generation = self.config.generation();
    println!(
      "synced {} ({} assets)",
      generation.store_name(),
      generation.manifest.len()
    );

    Ok(())
  }

  /// Resolve one site path through the cache pipeline.
  pub async fn get(&self, path: &str, navigate: bool, output: Option<&Path>) -> Result<()> {
    let url = self.config.base_url()?.join(path)?;
    let request = if navigate {
      AssetRequest::navigate(url)
    } else {
      AssetRequest::get(url)
    };

    let response = self.worker()?.handle(&request).await?;

    match output {
      Some(file) => std::fs::write(file, &response.body)?,
      None => std::io::stdout().write_all(&response.body)?,
    }

    Ok(())
  }

  /// Show the currently-reading line: paint cached-or-fallback, then
  /// revalidate and reprint if the value changed.
  pub async fn reading(&self, cached_only: bool) -> Result<()> {
    let cache = self.reading_cache()?;

    if cached_only {
      let painted = cache.read_cached().unwrap_or_else(widget::fallback);
      println!("{}", widget::format_line(&painted));
      return Ok(());
    }

    let (painted, repaint) = widget::paint_and_revalidate(&cache).await;
    println!("{}", widget::format_line(&painted));
    if let Some(fresh) = repaint {
      println!("{}", widget::format_line(&fresh));
    }

    Ok(())
  }

  /// Show cache generations and the state of the reading record.
  pub fn status(&self) -> Result<()> {
    let current = self.config.generation().store_name();
    let stores = self.store.list()?;

    if stores.is_empty() {
      println!("no cache generations installed");
    }
    for name in &stores {
      let count = self.store.count(name)?;
      let marker = if *name == current { " (current)" } else { "" };
      println!("{}: {} entries{}", name, count, marker);
    }

    match self.store.get(READING_CACHE_KEY)? {
      Some(raw) => match serde_json::from_str::<StoredReading>(&raw) {
        Ok(record) => {
          let age = chrono::Utc::now() - record.stored_at;
          println!(
            "reading record: {} by {} (stored {}m ago)",
            record.data.title,
            record.data.author,
            age.num_minutes()
          );
        }
        Err(_) => println!("reading record: malformed"),
      },
      None => println!("reading record: none"),
    }

    Ok(())
  }

  /// Delete every cache store and the reading record.
  pub fn purge(&self) -> Result<()> {
    for name in self.store.list()? {
      self.store.delete(&name)?;
    }
    self.store.remove(READING_CACHE_KEY)?;

    println!("cache cleared");
    Ok(())
  }
}
