//! gite-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus `GITE_*`
//! environment variables, opens the SQLite store, starts the background
//! workers and serves the booking API and calendar feeds over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash` in config.toml:
//!
//! ```
//! cargo run -p gite-server --bin server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use gite_booking::BookingService;
use gite_server::{AppState, ServerConfig, auth};
use gite_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Gîte availability and booking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let hash = auth::hash_password(&password).context("failed to hash password")?;
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("GITE").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if server_cfg.auth_password_hash.is_empty() {
    anyhow::bail!("auth_password_hash is not set; generate one with --hash-password");
  }
  if server_cfg.units.is_empty() {
    tracing::warn!("no units configured; every checkout will be rejected");
  }

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let service = BookingService::new(store, server_cfg.booking_settings())
    .context("failed to build booking service")?;

  tokio::spawn(
    service
      .clone()
      .run_sweeper(Duration::from_secs(server_cfg.sweep_interval_secs.max(1))),
  );
  if let Some(secs) = server_cfg.sync_interval_secs {
    tokio::spawn(service.clone().run_feed_sync(Duration::from_secs(secs.max(60))));
  }

  let state = AppState {
    service,
    auth: Arc::new(server_cfg.auth_config()),
  };

  let app = gite_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  tracing::info!("Calendar feeds served at {}/ical/<token>.ics", server_cfg.base_url);
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
