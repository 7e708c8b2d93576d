//! [`LocalStore`]: the in-process fallback store.
//!
//! Holds an ordered, newest-first list in memory. The persisted variant loads
//! its initial contents from an [`OfflineCache`] and mirrors every mutation
//! back into it, recording each one as a pending operation.

use chrono::Utc;
use inkflow_core::{
  client::{AutomationStatus, Client, ClientId, ClientPatch, NewClient, digits_only},
  kv::KeyValueStore,
  store::{ClientRepository, sort_newest_first},
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
  Result,
  cache::{MemoryKv, OfflineCache, OperationKind, PendingOperation},
};

#[derive(Debug, Default)]
struct State {
  clients: Vec<Client>,
  next_id: u64,
}

impl State {
  fn with(mut clients: Vec<Client>) -> Self {
    sort_newest_first(&mut clients);
    let next_id = clients
      .iter()
      .filter_map(|c| c.id.as_str().parse::<u64>().ok())
      .max()
      .map_or(1, |max| max + 1);
    Self { clients, next_id }
  }

  /// Sequential ids, always above any numeric id already present.
  fn allocate_id(&mut self) -> ClientId {
    let id = ClientId::new(self.next_id.to_string());
    self.next_id += 1;
    id
  }

  fn position(&self, id: &ClientId) -> Result<usize> {
    self
      .clients
      .iter()
      .position(|c| &c.id == id)
      .ok_or_else(|| inkflow_core::Error::NotFound(id.clone()).into())
  }
}

#[derive(Debug)]
pub struct LocalStore<K = MemoryKv> {
  state:  Mutex<State>,
  mirror: Option<OfflineCache<K>>,
}

impl LocalStore {
  /// An empty, purely in-memory store.
  pub fn new() -> Self { Self::seeded(Vec::new()) }

  /// An in-memory store starting with `clients`.
  pub fn seeded(clients: Vec<Client>) -> Self {
    Self { state: Mutex::new(State::with(clients)), mirror: None }
  }
}

impl Default for LocalStore {
  fn default() -> Self { Self::new() }
}

impl<K: KeyValueStore> LocalStore<K> {
  /// A store backed by `cache`: starts from the cached client list and writes
  /// every mutation through.
  pub async fn persisted(cache: OfflineCache<K>) -> Result<Self> {
    let clients = cache.cached_clients().await?;
    debug!(count = clients.len(), "local store loaded from cache");
    Ok(Self { state: Mutex::new(State::with(clients)), mirror: Some(cache) })
  }

  pub fn cache(&self) -> Option<&OfflineCache<K>> { self.mirror.as_ref() }

  async fn record(&self, clients: &[Client], op: PendingOperation) {
    let Some(cache) = &self.mirror else { return };
    if let Err(e) = cache.store_clients(clients).await {
      warn!(error = %e, "failed to mirror local store into cache");
    }
    if let Err(e) = cache.add_pending_operation(op).await {
      warn!(error = %e, "failed to record pending operation");
    }
  }
}

/// Longest query the REST search endpoint accepts.
const QUERY_MAX: usize = 100;

/// Digits with the usual phone punctuation and nothing else.
fn is_phone_shaped(query: &str) -> bool {
  query.chars().any(|c| c.is_ascii_digit())
    && query
      .chars()
      .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')' | '.'))
}

fn matches_query(client: &Client, query: &str) -> bool {
  let needle = query.to_lowercase();
  client.name.to_lowercase().contains(&needle)
    || client.phone.contains(query)
    || (is_phone_shaped(query) && client.phone_contains_digits(&digits_only(query)))
}

/// Serialize an operation payload, logging rather than failing the mutation.
fn op_data<T: serde::Serialize>(value: &T) -> Option<serde_json::Value> {
  serde_json::to_value(value)
    .inspect_err(|e| warn!(error = %e, "failed to serialize pending operation data"))
    .ok()
}

// ─── ClientRepository impl ───────────────────────────────────────────────────

impl<K: KeyValueStore> ClientRepository for LocalStore<K> {
  type Error = crate::Error;

  async fn list(&self) -> Result<Vec<Client>> { Ok(self.state.lock().await.clients.clone()) }

  async fn create(&self, input: NewClient) -> Result<Client> {
    let mut state = self.state.lock().await;
    if state.clients.iter().any(|c| c.phone == input.phone) {
      return Err(inkflow_core::Error::DuplicatePhone(input.phone).into());
    }

    let id = state.allocate_id();
    let client = input.into_client(id, Utc::now());
    state.clients.insert(0, client.clone());
    debug!(id = %client.id, "local client created");

    let data = op_data(&client);
    let op = PendingOperation::new(OperationKind::Create, Some(client.id.clone()), data);
    self.record(&state.clients, op).await;
    Ok(client)
  }

  async fn update<'a>(&'a self, id: &'a ClientId, patch: ClientPatch) -> Result<Client> {
    let mut state = self.state.lock().await;
    let at = state.position(id)?;

    let data = op_data(&patch);
    let client = &mut state.clients[at];
    client.apply(patch, Utc::now());
    let updated = client.clone();

    let op = PendingOperation::new(OperationKind::Update, Some(id.clone()), data);
    self.record(&state.clients, op).await;
    Ok(updated)
  }

  async fn delete<'a>(&'a self, id: &'a ClientId) -> Result<()> {
    let mut state = self.state.lock().await;
    let at = state.position(id)?;
    state.clients.remove(at);

    let op = PendingOperation::new(OperationKind::Delete, Some(id.clone()), None);
    self.record(&state.clients, op).await;
    Ok(())
  }

  async fn find_by_phone<'a>(&'a self, phone: &'a str) -> Result<Option<Client>> {
    let state = self.state.lock().await;
    Ok(state.clients.iter().find(|c| c.phone == phone).cloned())
  }

  /// Case-insensitive substring on the name, or a substring of the phone as
  /// typed. A phone-shaped query also matches on bare digits. The query is
  /// trimmed and must be 1 to 100 characters, as on the server.
  async fn search<'a>(&'a self, query: &'a str) -> Result<Vec<Client>> {
    let query = query.trim();
    let len = query.chars().count();
    if len == 0 || len > QUERY_MAX {
      return Err(crate::Error::Validation(
        "Search query is required and must be between 1-100 characters".to_owned(),
      ));
    }
    let state = self.state.lock().await;
    Ok(state.clients.iter().filter(|c| matches_query(c, query)).cloned().collect())
  }

  async fn by_automation_status(&self, status: AutomationStatus) -> Result<Vec<Client>> {
    let state = self.state.lock().await;
    Ok(state.clients.iter().filter(|c| c.ai_active == status).cloned().collect())
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone as _};
  use inkflow_core::{Classify, ErrorKind};

  use super::*;
  use crate::fixtures;

  #[tokio::test]
  async fn create_assigns_sequential_ids_newest_first() {
    let store = LocalStore::new();
    let a = store.create(NewClient::new("A", "+1")).await.unwrap();
    let b = store.create(NewClient::new("B", "+2")).await.unwrap();

    assert_eq!(a.id.as_str(), "1");
    assert_eq!(b.id.as_str(), "2");
    assert_eq!(a.created_at, a.updated_at);

    let names: Vec<_> = store.list().await.unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(names, ["B", "A"]);
  }

  #[tokio::test]
  async fn duplicate_phone_leaves_store_unchanged() {
    let store = LocalStore::new();
    store.create(NewClient::new("A", "+972-50-123-4567")).await.unwrap();

    let err = store
      .create(NewClient::new("Other", "+972-50-123-4567"))
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert_eq!(err.to_string(), "A client with this phone number already exists");
    assert_eq!(store.list().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn update_keeps_identity_and_advances_updated_at() {
    let store = LocalStore::new();
    let created = store.create(NewClient::new("A", "+1")).await.unwrap();

    let first = store
      .update(&created.id, ClientPatch { name: Some("B".into()), ..Default::default() })
      .await
      .unwrap();
    let second = store
      .update(&created.id, ClientPatch { size: Some("10cm".into()), ..Default::default() })
      .await
      .unwrap();

    assert_eq!(second.id, created.id);
    assert_eq!(second.created_at, created.created_at);
    assert_eq!(second.name, "B");
    assert!(first.updated_at > created.updated_at);
    assert!(second.updated_at > first.updated_at);
  }

  #[tokio::test]
  async fn unknown_id_is_not_found() {
    let store = LocalStore::new();
    let id = ClientId::from("404");
    let err = store.update(&id, ClientPatch::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = store.delete(&id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[tokio::test]
  async fn delete_removes_the_record() {
    let store = LocalStore::new();
    let c = store.create(NewClient::new("A", "+1")).await.unwrap();
    store.delete(&c.id).await.unwrap();
    assert!(store.list().await.unwrap().is_empty());
    assert!(store.delete(&c.id).await.is_err());
  }

  #[tokio::test]
  async fn seeded_store_orders_and_continues_ids() {
    let store = LocalStore::seeded(fixtures::sample_records());
    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 5);
    assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let next = store.create(NewClient::new("New", "+1")).await.unwrap();
    assert_eq!(next.id.as_str(), "6");
  }

  #[tokio::test]
  async fn search_matches_name_case_insensitively_and_phone_digits() {
    let at = Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap();
    let store = LocalStore::seeded(vec![
      NewClient::new("Maya Cohen", "+972-54-987-6543").into_client(ClientId::from("1"), at),
      NewClient::new("Dana", "+972-50-111-2222")
        .into_client(ClientId::from("2"), at + TimeDelta::minutes(1)),
    ]);

    let by_name = store.search("maya").await.unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].id.as_str(), "1");

    let by_digits = store.search("50-111-2222").await.unwrap();
    assert_eq!(by_digits.len(), 1);
    assert_eq!(by_digits[0].id.as_str(), "2");

    assert!(store.search("nobody").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn digits_inside_a_name_query_do_not_match_phones() {
    let at = Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap();
    let store = LocalStore::seeded(vec![
      NewClient::new("Maya Cohen", "+972-54-987-6543").into_client(ClientId::from("1"), at),
      NewClient::new("Dana", "+972-50-111-2222")
        .into_client(ClientId::from("2"), at + TimeDelta::minutes(1)),
    ]);

    assert!(store.search("Dana 2").await.unwrap().is_empty());
    assert!(store.search("Maya 9").await.unwrap().is_empty());

    let by_phone = store.search("(50) 111.2222").await.unwrap();
    assert_eq!(by_phone.len(), 1);
    assert_eq!(by_phone[0].name, "Dana");
    assert_eq!(store.search("  DANA ").await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn blank_or_oversized_query_is_rejected() {
    let store = LocalStore::seeded(fixtures::sample_records());
    let long = "a".repeat(101);
    for query in ["", "   ", long.as_str()] {
      let err = store.search(query).await.unwrap_err();
      assert_eq!(err.kind(), ErrorKind::Validation);
    }
  }

  #[tokio::test]
  async fn find_by_phone_and_status_filter() {
    let store = LocalStore::new();
    let mut input = NewClient::new("A", "+1");
    input.ai_active = AutomationStatus::Error;
    store.create(input).await.unwrap();
    store.create(NewClient::new("B", "+2")).await.unwrap();

    assert_eq!(store.find_by_phone("+2").await.unwrap().unwrap().name, "B");
    assert!(store.find_by_phone("2").await.unwrap().is_none());

    let errored = store.by_automation_status(AutomationStatus::Error).await.unwrap();
    assert_eq!(errored.len(), 1);
    assert_eq!(errored[0].name, "A");
  }

  #[tokio::test]
  async fn persisted_store_mirrors_mutations() {
    let cache = OfflineCache::new(MemoryKv::new());
    let store = LocalStore::persisted(cache).await.unwrap();
    let a = store.create(NewClient::new("A", "+1")).await.unwrap();
    store.create(NewClient::new("B", "+2")).await.unwrap();
    store.delete(&a.id).await.unwrap();

    let cache = store.cache().unwrap();
    let cached = cache.cached_clients().await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].name, "B");

    let ops = cache.pending_operations().await.unwrap();
    let kinds: Vec<_> = ops.iter().map(|op| op.kind).collect();
    assert_eq!(kinds, [OperationKind::Create, OperationKind::Create, OperationKind::Delete]);
    let created = ops[0].data.as_ref().unwrap();
    assert_eq!(created["name"], "A");
    assert_eq!(created["phone"], "+1");
    assert!(ops[2].data.is_none());
    // Mirroring never stamps a sync.
    assert!(cache.last_sync().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn persisted_store_reloads_from_cache() {
    let cache = OfflineCache::new(MemoryKv::new());
    cache.store_clients(&fixtures::sample_records()).await.unwrap();

    let store = LocalStore::persisted(cache).await.unwrap();
    assert_eq!(store.list().await.unwrap().len(), 5);
    let next = store.create(NewClient::new("New", "+1")).await.unwrap();
    assert_eq!(next.id.as_str(), "6");
  }
}
