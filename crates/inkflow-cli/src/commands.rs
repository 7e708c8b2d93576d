//! Subcommand implementations.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};
use clap::{Args, Subcommand};
use inkflow_core::{
  Classify, ErrorKind,
  client::{AutomationStatus, Client, ClientId, ClientPatch, MeetingType, NewClient, WorkflowStatus},
};
use inkflow_store_sqlite::SqliteKv;
use inkflow_sync::{
  AvailabilityProbe, ClientService, FixedProbe, HttpProbe, LocalStore, OfflineCache, PollHandle,
  RemoteStore, Served, StaticToken, fixtures, friendly_message,
};
use serde::Serialize;
use serde_json::Value;

use crate::config::Settings;

// ─── Wiring ──────────────────────────────────────────────────────────────────

/// Health probe, or a fixed answer when running with `--offline`.
pub enum CliProbe {
  Http(HttpProbe),
  Fixed(FixedProbe),
}

impl AvailabilityProbe for CliProbe {
  async fn is_available(&self) -> bool {
    match self {
      Self::Http(p) => p.is_available().await,
      Self::Fixed(p) => p.is_available().await,
    }
  }
}

pub type Service = ClientService<RemoteStore, LocalStore<SqliteKv>, CliProbe, SqliteKv>;

pub async fn open_cache(settings: &Settings) -> Result<OfflineCache<SqliteKv>> {
  let kv = SqliteKv::open(&settings.cache)
    .await
    .with_context(|| format!("opening cache {}", settings.cache.display()))?;
  Ok(OfflineCache::new(kv))
}

pub async fn connect(settings: &Settings, offline: bool) -> Result<Service> {
  let cache = open_cache(settings).await?;
  let local = LocalStore::persisted(cache.clone())
    .await
    .context("loading cached clients")?;
  let remote = RemoteStore::new(settings.url.clone(), StaticToken(settings.token.clone()))?;
  let probe = if offline {
    CliProbe::Fixed(FixedProbe::new(false))
  } else {
    CliProbe::Http(HttpProbe::new(&settings.url)?)
  };
  Ok(
    ClientService::new(remote, local, probe)
      .with_policy(settings.fallback)
      .with_cache(cache),
  )
}

// ─── Output ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
pub struct Output {
  pub json: bool,
}

impl Output {
  fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if self.json {
      println!("{}", serde_json::to_string_pretty(value)?);
    } else {
      println!("{}", text());
    }
    Ok(())
  }

  fn clients(&self, clients: &[Client]) -> Result<()> {
    self.emit(&clients, || {
      if clients.is_empty() {
        return "no clients".to_owned();
      }
      clients.iter().map(summary_line).collect::<Vec<_>>().join("\n")
    })
  }

  fn client(&self, client: &Client) -> Result<()> { self.emit(client, || detail(client)) }

  fn source<T>(&self, served: &Served<T>) {
    if !served.is_remote() {
      eprintln!("(served from {})", served.source);
    }
  }
}

fn summary_line(c: &Client) -> String {
  format!(
    "{:<26} {:<20} {:<18} {:<22} {}",
    c.id.as_str(),
    c.name,
    c.phone,
    c.status.to_string(),
    c.ai_active
  )
}

fn detail(c: &Client) -> String {
  let mut lines = vec![
    format!("id:           {}", c.id),
    format!("name:         {}", c.name),
    format!("phone:        {}", c.phone),
    format!("meeting:      {}", c.meeting_type),
    format!("status:       {}", c.status),
    format!("automation:   {}", c.ai_active),
  ];
  let optional = [
    ("email:        ", &c.email),
    ("instagram:    ", &c.instagram),
    ("placement:    ", &c.placement),
    ("size:         ", &c.size),
    ("budget:       ", &c.budget),
    ("next:         ", &c.next_appointment),
  ];
  for (label, value) in optional {
    if let Some(v) = value {
      lines.push(format!("{label}{v}"));
    }
  }
  if !c.idea_summary.is_empty() {
    lines.push(format!("idea:         {}", c.idea_summary));
  }
  if !c.reference_photos.is_empty() {
    lines.push(format!("photos:       {}", c.reference_photos.len()));
  }
  lines.push(format!("created:      {}", c.created_at.with_timezone(&Local)));
  lines.push(format!("updated:      {}", c.updated_at.with_timezone(&Local)));
  lines.join("\n")
}

// ─── Client fields ───────────────────────────────────────────────────────────

/// Client fields accepted by `add`, `update` and `cache draft save`.
#[derive(Args, Debug, Default, Clone)]
pub struct ClientFields {
  #[arg(long)]
  pub name:             Option<String>,
  #[arg(long)]
  pub phone:            Option<String>,
  /// consultation, appointment or follow-up.
  #[arg(long, value_name = "TYPE")]
  pub meeting_type:     Option<MeetingType>,
  #[arg(long)]
  pub idea:             Option<String>,
  #[arg(long)]
  pub description:      Option<String>,
  /// Workflow status, e.g. "In Progress".
  #[arg(long)]
  pub status:           Option<WorkflowStatus>,
  /// completed, error, pending or in_progress.
  #[arg(long, value_name = "STATUS")]
  pub automation:       Option<AutomationStatus>,
  #[arg(long)]
  pub email:            Option<String>,
  #[arg(long)]
  pub instagram:        Option<String>,
  #[arg(long)]
  pub placement:        Option<String>,
  #[arg(long)]
  pub size:             Option<String>,
  #[arg(long)]
  pub budget:           Option<String>,
  #[arg(long)]
  pub next_appointment: Option<String>,
}

impl ClientFields {
  pub fn into_patch(self) -> ClientPatch {
    ClientPatch {
      name: self.name,
      phone: self.phone,
      meeting_type: self.meeting_type,
      idea_summary: self.idea,
      tattoo_description: self.description,
      ai_active: self.automation,
      status: self.status,
      email: self.email,
      instagram: self.instagram,
      placement: self.placement,
      size: self.size,
      budget: self.budget,
      next_appointment: self.next_appointment,
      ..ClientPatch::default()
    }
  }

  pub fn into_new_client(self) -> Result<NewClient> {
    let (Some(name), Some(phone)) = (self.name, self.phone) else {
      bail!("--name and --phone are required");
    };
    Ok(NewClient {
      meeting_type: self.meeting_type.unwrap_or_default(),
      idea_summary: self.idea.unwrap_or_default(),
      tattoo_description: self.description,
      ai_active: self.automation.unwrap_or_default(),
      status: self.status.unwrap_or_default(),
      email: self.email,
      instagram: self.instagram,
      placement: self.placement,
      size: self.size,
      budget: self.budget,
      next_appointment: self.next_appointment,
      ..NewClient::new(name, phone)
    })
  }
}

// ─── Client commands ─────────────────────────────────────────────────────────

pub async fn list(svc: &Service, out: Output, status: Option<AutomationStatus>) -> Result<()> {
  let served = match status {
    Some(s) => svc.by_automation_status(s).await?,
    None => svc.fetch_all().await?,
  };
  out.source(&served);
  out.clients(&served.value)
}

pub async fn add(svc: &Service, out: Output, fields: ClientFields) -> Result<()> {
  let served = svc.add(fields.into_new_client()?).await?;
  out.source(&served);
  if let Some(cache) = svc.cache() {
    cache.clear_draft(None).await?;
  }
  out.client(&served.value)
}

pub async fn update(svc: &Service, out: Output, id: String, fields: ClientFields) -> Result<()> {
  let patch = fields.into_patch();
  if patch.is_empty() {
    bail!("nothing to update");
  }
  let id = ClientId::new(id);
  let served = svc.update(&id, patch).await?;
  out.source(&served);
  if let Some(cache) = svc.cache() {
    cache.clear_draft(Some(&id)).await?;
  }
  out.client(&served.value)
}

pub async fn delete(svc: &Service, id: String) -> Result<()> {
  let served = svc.delete(&ClientId::new(id)).await?;
  Output { json: false }.source(&served);
  println!("Client deleted successfully");
  Ok(())
}

pub async fn search(svc: &Service, out: Output, query: String) -> Result<()> {
  let served = svc.search(&query).await?;
  out.source(&served);
  out.clients(&served.value)
}

pub async fn phone(svc: &Service, out: Output, phone: String) -> Result<()> {
  let served = svc.find_by_phone(&phone).await?;
  out.source(&served);
  match &served.value {
    Some(client) => out.client(client),
    None => bail!("no client with phone {phone}"),
  }
}

/// Add the sample studio clients, skipping any that already exist.
pub async fn seed(svc: &Service) -> Result<()> {
  let mut added = 0;
  for input in fixtures::sample_clients() {
    let name = input.name.clone();
    match svc.add(input).await {
      Ok(served) => {
        added += 1;
        println!("added {name} ({})", served.source);
      }
      Err(e) if e.kind() == ErrorKind::Duplicate => println!("{name} already exists, skipping"),
      Err(e) => return Err(e.into()),
    }
  }
  println!("{added} sample clients added");
  Ok(())
}

/// Re-fetch on a fixed period until interrupted.
pub async fn watch(svc: Service, out: Output, period: Duration) -> Result<()> {
  let svc = Arc::new(svc);
  let handle = PollHandle::spawn(period, move || {
    let svc = svc.clone();
    async move {
      match svc.fetch_all().await {
        Ok(served) => {
          let at = Local::now().format("%H:%M:%S");
          println!("── {at} · {} clients · {}", served.value.len(), served.source);
          if let Err(e) = out.clients(&served.value) {
            eprintln!("{e:#}");
          }
        }
        Err(e) => eprintln!("refresh failed: {}", friendly_message(&e)),
      }
    }
  });

  tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
  handle.stop().await;
  Ok(())
}

// ─── Cache commands ──────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
  /// Last sync time, staleness and entry counts.
  Status,
  /// Mutations made while the server was not in use.
  Pending {
    /// Empty the list after printing it.
    #[arg(long)]
    clear: bool,
  },
  /// Remove every cached entry.
  Clear,
  /// Read or write a stored preference.
  Pref {
    key:   String,
    /// JSON value to store; plain text is stored as a string.
    value: Option<String>,
  },
  /// Work with unsaved edits.
  #[command(subcommand)]
  Draft(DraftCommand),
}

#[derive(Subcommand, Debug)]
pub enum DraftCommand {
  Show {
    /// Client id; omit for the new-client draft.
    #[arg(long)]
    id: Option<String>,
  },
  Save {
    #[arg(long)]
    id:     Option<String>,
    #[command(flatten)]
    fields: ClientFields,
  },
  Clear {
    #[arg(long)]
    id: Option<String>,
  },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheStatus {
  last_sync: Option<chrono::DateTime<Utc>>,
  stale:     bool,
  clients:   usize,
  pending:   usize,
}

pub async fn cache(cache: OfflineCache<SqliteKv>, out: Output, cmd: CacheCommand) -> Result<()> {
  match cmd {
    CacheCommand::Status => {
      let status = CacheStatus {
        last_sync: cache.last_sync().await?,
        stale:     cache.is_stale().await?,
        clients:   cache.cached_clients().await?.len(),
        pending:   cache.pending_operations().await?.len(),
      };
      out.emit(&status, || {
        let synced = status
          .last_sync
          .map_or("never".to_owned(), |at| at.with_timezone(&Local).to_string());
        format!(
          "last sync: {synced}{}\nclients:   {}\npending:   {}",
          if status.stale { " (stale)" } else { "" },
          status.clients,
          status.pending,
        )
      })
    }
    CacheCommand::Pending { clear } => {
      let ops = cache.pending_operations().await?;
      out.emit(&ops, || {
        ops
          .iter()
          .map(|op| {
            let id = op.client_id.as_ref().map_or("-", ClientId::as_str);
            format!("{}  {:<6} {id}", op.timestamp.with_timezone(&Local), op.kind)
          })
          .collect::<Vec<_>>()
          .join("\n")
      })?;
      if clear {
        cache.clear_pending_operations().await?;
      }
      Ok(())
    }
    CacheCommand::Clear => {
      cache.clear_all().await?;
      println!("cache cleared");
      Ok(())
    }
    CacheCommand::Pref { key, value: Some(raw) } => {
      let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
      cache.set_preference(&key, value).await?;
      Ok(())
    }
    CacheCommand::Pref { key, value: None } => match cache.preference(&key).await? {
      Some(v) => out.emit(&v, || v.to_string()),
      None => bail!("no preference {key}"),
    },
    CacheCommand::Draft(cmd) => draft(cache, out, cmd).await,
  }
}

async fn draft(cache: OfflineCache<SqliteKv>, out: Output, cmd: DraftCommand) -> Result<()> {
  match cmd {
    DraftCommand::Show { id } => {
      let id = id.map(ClientId::new);
      match cache.draft(id.as_ref()).await? {
        Some(d) => out.emit(&d, || serde_json::to_string_pretty(&d).unwrap_or_default()),
        None => bail!("no draft"),
      }
    }
    DraftCommand::Save { id, fields } => {
      let id = id.map(ClientId::new);
      let saved = cache.save_draft(id.as_ref(), fields.into_patch()).await?;
      println!("draft saved at {}", saved.last_modified.with_timezone(&Local));
      Ok(())
    }
    DraftCommand::Clear { id } => {
      let id = id.map(ClientId::new);
      cache.clear_draft(id.as_ref()).await?;
      Ok(())
    }
  }
}
