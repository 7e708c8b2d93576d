//! inkflow-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `INKFLOW_*` environment variables, opens the SQLite client store, and
//! serves the REST API over HTTP.
//!
//! # Token hash generation
//!
//! To generate the argon2 PHC string for an entry of `token_hashes`:
//!
//! ```
//! cargo run -p inkflow-server -- --hash-token
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use inkflow_server::{AppState, ServerConfig, auth::hash_token, default_image_domains};
use inkflow_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Inkflow CRM server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a token entered on stdin and exit.
  #[arg(long)]
  hash_token: bool,
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

  // Helper mode: hash a token and exit.
  if cli.hash_token {
    let token = read_token()?;
    let hash = hash_token(&token).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .set_default("host", "0.0.0.0")?
    .set_default("port", 3001)?
    .set_default("store_path", "inkflow.db")?
    .set_default("image_domains", default_image_domains())?
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("INKFLOW")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("token_hashes")
        .with_list_parse_key("image_domains"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if server_cfg.token_hashes.is_empty() {
    tracing::warn!("no token_hashes configured; every /api request will be rejected");
  }

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let app = inkflow_server::router(AppState::new(store, server_cfg));

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a token from stdin.
fn read_token() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Token: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  let token = line.trim().to_string();
  anyhow::ensure!(!token.is_empty(), "empty token");
  Ok(token)
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
