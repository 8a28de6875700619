mod app;
mod config;
mod net;
mod reading;
mod store;
mod worker;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "offsite")]
#[command(about = "Offline-first mirror and reading cache for a personal website")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/offsite/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Install the configured asset generation and prune old ones
  Sync,
  /// Fetch a site path through the cache pipeline
  Get {
    /// Site-relative path (e.g. "/photos.html")
    path: String,
    /// Treat the request as a page navigation (enables the offline fallback)
    #[arg(long)]
    navigate: bool,
    /// Write the body to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// Show the currently-reading line, then revalidate it
  Reading {
    /// Skip the network refresh and only show the cached value
    #[arg(long)]
    cached_only: bool,
  },
  /// Show cache generations and the reading record
  Status,
  /// Delete every cache store and the reading record
  Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  init_tracing();

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;
  let app = app::App::new(config)?;

  match args.command {
    Command::Sync => app.sync().await,
    Command::Get {
      path,
      navigate,
      output,
    } => app.get(&path, navigate, output.as_deref()).await,
    Command::Reading { cached_only } => app.reading(cached_only).await,
    Command::Status => app.status(),
    Command::Purge => app.purge(),
  }
}

/// Log to a daily-rotated file under the data directory; stdout stays
/// reserved for command output. Falls back to stderr when no data
/// directory is available.
fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("offsite=info"));

  let log_dir = dirs::data_dir().map(|d| d.join("offsite").join("logs"));
  match log_dir {
    Some(dir) if std::fs::create_dir_all(&dir).is_ok() => {
      let appender = tracing_appender::rolling::daily(dir, "offsite.log");
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(appender)
        .with_ansi(false)
        .init();
    }
    _ => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    }
  }
}
