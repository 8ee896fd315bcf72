//! academy server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite record store, initialises the academy, and serves the JSON API.
//!
//! # Wiping the database
//!
//! ```
//! cargo run -p academy-server --bin server -- --reset
//! ```

use std::path::PathBuf;

use academy_api::{AppState, InsightClient};
use academy_core::Academy;
use academy_server::{ServerConfig, app, expand_tilde};
use academy_store_sqlite::SqliteKv;
use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Academy dashboard server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Permanently delete all student and attendance data, then exit.
  #[arg(long)]
  reset: bool,

  /// Skip the confirmation prompt for `--reset`.
  #[arg(long, requires = "reset")]
  yes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  let kv = SqliteKv::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let mut academy = Academy::initialize(kv, server_cfg.attendance).await;

  // Helper mode: wipe everything and exit.
  if cli.reset {
    if !cli.yes && !confirm_reset()? {
      println!("Reset cancelled.");
      return Ok(());
    }
    academy.reset_all().await.context("reset failed")?;
    println!("Database reset.");
    return Ok(());
  }

  let insights = InsightClient::new(server_cfg.insight_config())
    .context("failed to build insight client")?;
  if server_cfg.gemini_api_key.is_none() {
    tracing::warn!("no gemini_api_key configured; AI insights will use fallbacks");
  }

  let state = AppState::new(academy, insights);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}/api");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app(state)).await.context("server error")?;

  Ok(())
}

/// Ask for a yes/no answer on stdin.
fn confirm_reset() -> anyhow::Result<bool> {
  use std::io::{self, BufRead, Write};
  print!(
    "WARNING: This will permanently delete all student and attendance data \
     from the database. Are you sure? [y/N] "
  );
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
