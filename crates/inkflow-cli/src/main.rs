//! `inkflow`: command-line client for the Inkflow studio CRM.
//!
//! # Usage
//!
//! ```
//! inkflow --url http://localhost:3001 --token secret list
//! inkflow add --name "Maya Cohen" --phone +972-54-987-6543 --idea "rose on the shoulder"
//! inkflow --offline search maya
//! inkflow --config ~/.config/inkflow/config.toml watch
//! ```
//!
//! Every command goes to the server when its health check answers and to the
//! local cache otherwise; results served locally are flagged on stderr.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use inkflow_core::client::AutomationStatus;
use inkflow_sync::{FallbackPolicy, friendly_message};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use commands::{CacheCommand, ClientFields, Output};
use config::{ConfigFile, Overrides, Settings};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "inkflow", version, about = "Command-line client for the Inkflow studio CRM")]
struct Args {
  /// Path to a TOML config file (url, token, fallback, cache, poll_seconds).
  #[arg(short, long, value_name = "FILE", global = true)]
  config: Option<PathBuf>,

  /// Base URL of the Inkflow server (default: http://localhost:3001).
  #[arg(long, env = "INKFLOW_URL", global = true)]
  url: Option<String>,

  /// Bearer token for the API.
  #[arg(long, env = "INKFLOW_TOKEN", hide_env_values = true, global = true)]
  token: Option<String>,

  /// What to do when the server is reachable but fails: always, connectivity
  /// or never fall back to the local cache.
  #[arg(long, value_name = "POLICY", global = true)]
  fallback: Option<FallbackPolicy>,

  /// Skip the server entirely and work from the local cache.
  #[arg(long, global = true)]
  offline: bool,

  /// Path to the local cache database (default: inkflow-cache.db).
  #[arg(long, value_name = "FILE", global = true)]
  cache: Option<PathBuf>,

  /// Print JSON instead of text.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List clients, newest first.
  List {
    /// Only clients whose automation status matches.
    #[arg(long, value_name = "STATUS")]
    status: Option<AutomationStatus>,
  },
  /// Create a client.
  Add(ClientFields),
  /// Change some fields of a client.
  Update {
    id:     String,
    #[command(flatten)]
    fields: ClientFields,
  },
  /// Delete a client.
  Delete { id: String },
  /// Search by name or phone.
  Search { query: String },
  /// Look up the client with exactly this phone number.
  Phone { phone: String },
  /// Add the sample studio clients.
  Seed,
  /// Keep re-fetching the client list until interrupted.
  Watch,
  /// Inspect or manage the local cache.
  #[command(subcommand)]
  Cache(CacheCommand),
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  if let Err(e) = run(Args::parse()).await {
    match e.downcast_ref::<inkflow_sync::Error>() {
      Some(sync) => eprintln!("error: {}", friendly_message(sync)),
      None => eprintln!("error: {e:#}"),
    }
    std::process::exit(1);
  }
}

async fn run(args: Args) -> Result<()> {
  let file = match &args.config {
    Some(path) => ConfigFile::load(path)?,
    None => ConfigFile::default(),
  };
  let settings = Settings::resolve(
    Overrides {
      url:      args.url,
      token:    args.token,
      fallback: args.fallback,
      cache:    args.cache,
    },
    file,
  );
  let out = Output { json: args.json };

  let offline = args.offline;
  let connect = || commands::connect(&settings, offline);

  match args.command {
    Command::List { status } => commands::list(&connect().await?, out, status).await,
    Command::Add(fields) => commands::add(&connect().await?, out, fields).await,
    Command::Update { id, fields } => commands::update(&connect().await?, out, id, fields).await,
    Command::Delete { id } => commands::delete(&connect().await?, id).await,
    Command::Search { query } => commands::search(&connect().await?, out, query).await,
    Command::Phone { phone } => commands::phone(&connect().await?, out, phone).await,
    Command::Seed => commands::seed(&connect().await?).await,
    Command::Watch => commands::watch(connect().await?, out, settings.poll_period).await,
    Command::Cache(cmd) => commands::cache(commands::open_cache(&settings).await?, out, cmd).await,
  }
}
