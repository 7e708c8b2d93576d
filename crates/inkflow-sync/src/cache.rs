//! Device-side persisted cache over any [`KeyValueStore`].
//!
//! Every entry is a whole JSON value under a fixed key; writes replace the
//! previous value and the last writer wins.

use std::{
  collections::HashMap,
  convert::Infallible,
  sync::{Mutex, PoisonError},
};

use chrono::{DateTime, TimeDelta, Utc};
use inkflow_core::{
  client::{Client, ClientId, ClientPatch},
  kv::KeyValueStore,
  normalize::normalize_all,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::{Error, Result};

pub const CLIENTS_KEY: &str = "cached_clients";
pub const LAST_SYNC_KEY: &str = "last_sync_timestamp";
pub const PREFERENCES_KEY: &str = "user_preferences";
pub const PENDING_KEY: &str = "pending_operations";

/// The cache counts as stale once the last sync is older than this.
pub const STALE_AFTER: TimeDelta = TimeDelta::hours(1);

/// `draft_<id>`, or `draft_new` for a client not yet created.
pub fn draft_key(id: Option<&ClientId>) -> String {
  format!("draft_{}", id.map_or("new", ClientId::as_str))
}

// ─── Entries ─────────────────────────────────────────────────────────────────

/// An unsaved edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:            Option<ClientId>,
  #[serde(flatten)]
  pub fields:        ClientPatch,
  pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
  Create,
  Update,
  Delete,
}

/// A mutation made while the remote was not in use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
  #[serde(rename = "type")]
  pub kind:      OperationKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub client_id: Option<ClientId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data:      Option<Value>,
  pub timestamp: DateTime<Utc>,
}

impl PendingOperation {
  pub fn new(kind: OperationKind, client_id: Option<ClientId>, data: Option<Value>) -> Self {
    Self { kind, client_id, data, timestamp: Utc::now() }
  }
}

// ─── Cache ───────────────────────────────────────────────────────────────────

/// Typed access to the cache keys.
#[derive(Debug, Clone)]
pub struct OfflineCache<K> {
  kv: K,
}

impl<K: KeyValueStore> OfflineCache<K> {
  pub fn new(kv: K) -> Self { Self { kv } }

  async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    match self.kv.get(key).await.map_err(Error::cache)? {
      Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
      None => Ok(None),
    }
  }

  async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    self.kv.set(key, raw).await.map_err(Error::cache)
  }

  // ── Clients ──

  /// Replace the cached list and stamp the sync time.
  pub async fn cache_clients(&self, clients: &[Client]) -> Result<()> {
    self.store_clients(clients).await?;
    self.write(LAST_SYNC_KEY, &Utc::now()).await?;
    debug!(count = clients.len(), "clients cached");
    Ok(())
  }

  /// Replace the cached list without touching the sync time.
  pub async fn store_clients(&self, clients: &[Client]) -> Result<()> {
    self.write(CLIENTS_KEY, clients).await
  }

  /// The cached list, empty when nothing has been cached. Entries are
  /// normalized on the way out, so older cache formats still load.
  pub async fn cached_clients(&self) -> Result<Vec<Client>> {
    let values: Vec<Value> = self.read(CLIENTS_KEY).await?.unwrap_or_default();
    let (clients, rejected) = normalize_all(values);
    if !rejected.is_empty() {
      warn!(count = rejected.len(), "dropping unreadable cached clients");
    }
    Ok(clients)
  }

  pub async fn last_sync(&self) -> Result<Option<DateTime<Utc>>> { self.read(LAST_SYNC_KEY).await }

  pub async fn is_stale(&self) -> Result<bool> { self.is_stale_at(Utc::now()).await }

  /// Stale when never synced or when the last sync is more than
  /// [`STALE_AFTER`] before `now`.
  pub async fn is_stale_at(&self, now: DateTime<Utc>) -> Result<bool> {
    Ok(match self.last_sync().await? {
      Some(at) => now - at > STALE_AFTER,
      None => true,
    })
  }

  // ── Preferences ──

  pub async fn preferences(&self) -> Result<Map<String, Value>> {
    Ok(self.read(PREFERENCES_KEY).await?.unwrap_or_default())
  }

  pub async fn preference(&self, key: &str) -> Result<Option<Value>> {
    Ok(self.preferences().await?.remove(key))
  }

  pub async fn set_preference(&self, key: &str, value: Value) -> Result<()> {
    let mut prefs = self.preferences().await?;
    prefs.insert(key.to_owned(), value);
    self.write(PREFERENCES_KEY, &prefs).await
  }

  // ── Drafts ──

  /// Save `fields` as the draft for `id` (or the new-client draft), stamped
  /// with the current time.
  pub async fn save_draft(&self, id: Option<&ClientId>, fields: ClientPatch) -> Result<Draft> {
    let draft = Draft { id: id.cloned(), fields, last_modified: Utc::now() };
    self.write(&draft_key(id), &draft).await?;
    Ok(draft)
  }

  pub async fn draft(&self, id: Option<&ClientId>) -> Result<Option<Draft>> {
    self.read(&draft_key(id)).await
  }

  pub async fn clear_draft(&self, id: Option<&ClientId>) -> Result<()> {
    self.kv.remove(&draft_key(id)).await.map_err(Error::cache)
  }

  // ── Pending operations ──

  pub async fn pending_operations(&self) -> Result<Vec<PendingOperation>> {
    Ok(self.read(PENDING_KEY).await?.unwrap_or_default())
  }

  pub async fn add_pending_operation(&self, op: PendingOperation) -> Result<()> {
    let mut ops = self.pending_operations().await?;
    ops.push(op);
    self.write(PENDING_KEY, &ops).await
  }

  pub async fn clear_pending_operations(&self) -> Result<()> {
    self.kv.remove(PENDING_KEY).await.map_err(Error::cache)
  }

  /// Remove every entry, including drafts and preferences.
  pub async fn clear_all(&self) -> Result<()> { self.kv.clear().await.map_err(Error::cache) }
}

// ─── In-memory store ─────────────────────────────────────────────────────────

/// Process-local key-value store.
#[derive(Debug, Default)]
pub struct MemoryKv {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
  pub fn new() -> Self { Self::default() }

  fn with<R>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> R) -> R {
    let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
  }
}

impl KeyValueStore for MemoryKv {
  type Error = Infallible;

  async fn get<'a>(&'a self, key: &'a str) -> Result<Option<String>, Infallible> {
    Ok(self.with(|m| m.get(key).cloned()))
  }

  async fn set<'a>(&'a self, key: &'a str, value: String) -> Result<(), Infallible> {
    self.with(|m| m.insert(key.to_owned(), value));
    Ok(())
  }

  async fn remove<'a>(&'a self, key: &'a str) -> Result<(), Infallible> {
    self.with(|m| m.remove(key));
    Ok(())
  }

  async fn clear(&self) -> Result<(), Infallible> {
    self.with(HashMap::clear);
    Ok(())
  }
}
