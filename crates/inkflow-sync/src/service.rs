//! [`ClientService`]: the single entry point the app talks to.
//!
//! Every operation probes the remote first. An unreachable remote sends the
//! call to the local store; a reachable one is tried, and its failures are
//! classified: credential rejections go to the auth-error handler and are
//! re-raised, caller mistakes (not found, duplicate, validation) are
//! surfaced, and everything else is governed by the [`FallbackPolicy`].

use std::{fmt, future::Future, sync::Arc};

use inkflow_core::{
  Classify, ErrorKind,
  client::{AutomationStatus, Client, ClientId, ClientPatch, NewClient},
  kv::KeyValueStore,
  store::ClientRepository,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  auth::{AuthErrorHandler, LogAuthErrors},
  cache::{MemoryKv, OfflineCache},
  probe::AvailabilityProbe,
};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// When a reachable remote fails with an unclassified error, whether to serve
/// the call from the local store instead.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FallbackPolicy {
  /// Fall back on any such failure.
  #[default]
  Always,
  /// Fall back only on transport failures and 503s.
  Connectivity,
  /// Surface every remote failure.
  Never,
}

impl FallbackPolicy {
  pub fn allows(self, kind: ErrorKind) -> bool {
    match self {
      Self::Always => true,
      Self::Connectivity => kind == ErrorKind::Unavailable,
      Self::Never => false,
    }
  }
}

// ─── Served ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
  /// The probe reported the remote unreachable; it was never called.
  Unavailable,
  /// The remote was called and failed with this message.
  RemoteFailed(String),
}

/// Where a result came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
  Remote,
  Local(FallbackReason),
}

impl fmt::Display for Source {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Remote => f.write_str("remote"),
      Self::Local(FallbackReason::Unavailable) => f.write_str("local (remote unavailable)"),
      Self::Local(FallbackReason::RemoteFailed(msg)) => write!(f, "local (remote failed: {msg})"),
    }
  }
}

/// A result together with the store that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Served<T> {
  pub value:  T,
  pub source: Source,
}

impl<T> Served<T> {
  pub fn remote(value: T) -> Self { Self { value, source: Source::Remote } }

  pub fn local(value: T, reason: FallbackReason) -> Self {
    Self { value, source: Source::Local(reason) }
  }

  pub fn is_remote(&self) -> bool { self.source == Source::Remote }

  pub fn into_inner(self) -> T { self.value }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Served<U> {
    Served { value: f(self.value), source: self.source }
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct ClientService<R, L, P, K = MemoryKv> {
  remote:        R,
  local:         L,
  probe:         P,
  policy:        FallbackPolicy,
  on_auth_error: Arc<dyn AuthErrorHandler>,
  cache:         Option<OfflineCache<K>>,
}

impl<R, L, P> ClientService<R, L, P> {
  pub fn new(remote: R, local: L, probe: P) -> Self {
    Self {
      remote,
      local,
      probe,
      policy: FallbackPolicy::default(),
      on_auth_error: Arc::new(LogAuthErrors),
      cache: None,
    }
  }
}

impl<R, L, P, K> ClientService<R, L, P, K> {
  pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_auth_handler(mut self, handler: impl AuthErrorHandler + 'static) -> Self {
    self.on_auth_error = Arc::new(handler);
    self
  }

  /// Refresh `cache` after every successful remote fetch.
  pub fn with_cache<K2>(self, cache: OfflineCache<K2>) -> ClientService<R, L, P, K2> {
    ClientService {
      remote:        self.remote,
      local:         self.local,
      probe:         self.probe,
      policy:        self.policy,
      on_auth_error: self.on_auth_error,
      cache:         Some(cache),
    }
  }

  pub fn policy(&self) -> FallbackPolicy { self.policy }

  pub fn remote(&self) -> &R { &self.remote }

  pub fn local(&self) -> &L { &self.local }

  pub fn cache(&self) -> Option<&OfflineCache<K>> { self.cache.as_ref() }
}

impl<R, L, P, K> ClientService<R, L, P, K>
where
  R: ClientRepository,
  R::Error: Into<Error>,
  L: ClientRepository,
  L::Error: Into<Error>,
  P: AvailabilityProbe,
  K: KeyValueStore,
{
  /// Run `remote` or `local` according to the probe and the outcome of
  /// `remote`.
  async fn route<T, RF, LF>(
    &self,
    op: &'static str,
    remote: impl FnOnce() -> RF,
    local: impl FnOnce() -> LF,
  ) -> Result<Served<T>>
  where
    RF: Future<Output = Result<T, R::Error>>,
    LF: Future<Output = Result<T, L::Error>>,
  {
    if !self.probe.is_available().await {
      info!(op, "remote unavailable, using local store");
      let value = local().await.map_err(Into::<Error>::into)?;
      return Ok(Served::local(value, FallbackReason::Unavailable));
    }

    let e: Error = match remote().await {
      Ok(value) => {
        debug!(op, "served by remote");
        return Ok(Served::remote(value));
      }
      Err(e) => e.into(),
    };
    let reason = self.on_remote_error(op, e)?;
    let value = local().await.map_err(Into::<Error>::into)?;
    Ok(Served::local(value, reason))
  }

  /// Either the reason to fall back, or the error to surface.
  fn on_remote_error(&self, op: &'static str, e: Error) -> Result<FallbackReason> {
    match e.kind() {
      ErrorKind::Unauthorized => {
        self.on_auth_error.handle(&e);
        Err(e)
      }
      ErrorKind::NotFound | ErrorKind::Duplicate | ErrorKind::Validation => Err(e),
      kind if self.policy.allows(kind) => {
        warn!(op, error = %e, "remote failed, falling back to local store");
        Ok(FallbackReason::RemoteFailed(e.to_string()))
      }
      _ => {
        warn!(op, error = %e, policy = %self.policy, "remote failed");
        Err(e)
      }
    }
  }

  /// Every client, newest first. A remote result also refreshes the cache.
  pub async fn fetch_all(&self) -> Result<Served<Vec<Client>>> {
    let served = self
      .route("fetch_all", || self.remote.list(), || self.local.list())
      .await?;
    if let (true, Some(cache)) = (served.is_remote(), &self.cache) {
      if let Err(e) = cache.cache_clients(&served.value).await {
        warn!(error = %e, "failed to refresh client cache");
      }
    }
    Ok(served)
  }

  pub async fn add(&self, input: NewClient) -> Result<Served<Client>> {
    let fallback = input.clone();
    self
      .route("add", || self.remote.create(input), || self.local.create(fallback))
      .await
  }

  pub async fn update(&self, id: &ClientId, patch: ClientPatch) -> Result<Served<Client>> {
    let fallback = patch.clone();
    self
      .route("update", || self.remote.update(id, patch), || self.local.update(id, fallback))
      .await
  }

  pub async fn delete(&self, id: &ClientId) -> Result<Served<()>> {
    self
      .route("delete", || self.remote.delete(id), || self.local.delete(id))
      .await
  }

  pub async fn find_by_phone(&self, phone: &str) -> Result<Served<Option<Client>>> {
    self
      .route(
        "find_by_phone",
        || self.remote.find_by_phone(phone),
        || self.local.find_by_phone(phone),
      )
      .await
  }

  pub async fn search(&self, query: &str) -> Result<Served<Vec<Client>>> {
    self
      .route("search", || self.remote.search(query), || self.local.search(query))
      .await
  }

  pub async fn by_automation_status(
    &self,
    status: AutomationStatus,
  ) -> Result<Served<Vec<Client>>> {
    self
      .route(
        "by_automation_status",
        || self.remote.by_automation_status(status),
        || self.local.by_automation_status(status),
      )
      .await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use serde_json::json;
  use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
  };

  use super::*;
  use crate::{auth::StaticToken, local::LocalStore, probe::FixedProbe, remote::RemoteStore};

  type Service = ClientService<RemoteStore, LocalStore, FixedProbe>;

  fn service(server: &MockServer, available: bool) -> Service {
    let remote = RemoteStore::new(server.uri(), StaticToken::new("tok")).unwrap();
    ClientService::new(remote, LocalStore::new(), FixedProbe::new(available))
  }

  async fn respond(server: &MockServer, verb: &str, at: &str, status: u16, body: serde_json::Value) {
    Mock::given(method(verb))
      .and(path(at))
      .respond_with(ResponseTemplate::new(status).set_body_json(body))
      .mount(server)
      .await;
  }

  #[test]
  fn policy_parses_from_config_text() {
    assert_eq!("connectivity".parse::<FallbackPolicy>().unwrap(), FallbackPolicy::Connectivity);
    assert_eq!(FallbackPolicy::Never.to_string(), "never");
    assert!(FallbackPolicy::Always.allows(ErrorKind::Other));
    assert!(!FallbackPolicy::Connectivity.allows(ErrorKind::Other));
    assert!(FallbackPolicy::Connectivity.allows(ErrorKind::Unavailable));
    assert!(!FallbackPolicy::Never.allows(ErrorKind::Unavailable));
  }

  #[tokio::test]
  async fn unavailable_remote_is_never_called() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(201))
      .expect(0)
      .mount(&server)
      .await;

    let svc = service(&server, false);
    let served = svc.add(NewClient::new("Maya", "+972")).await.unwrap();
    assert_eq!(served.source, Source::Local(FallbackReason::Unavailable));
    assert_eq!(served.value.id.as_str(), "1");
    assert_eq!(svc.local().list().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn remote_success_is_tagged_remote() {
    let server = MockServer::start().await;
    respond(&server, "GET", "/api/clients", 200, json!([{ "id": "a", "name": "A", "phone": "+1" }]))
      .await;

    let served = service(&server, true).fetch_all().await.unwrap();
    assert!(served.is_remote());
    assert_eq!(served.value[0].id.as_str(), "a");
  }

  #[tokio::test]
  async fn server_error_falls_back_under_default_policy() {
    let server = MockServer::start().await;
    respond(&server, "GET", "/api/clients", 500, json!({ "error": "Failed to fetch clients" })).await;

    let served = service(&server, true).fetch_all().await.unwrap();
    assert_eq!(
      served.source,
      Source::Local(FallbackReason::RemoteFailed("Failed to fetch clients".into()))
    );
    assert!(served.value.is_empty());
  }

  #[tokio::test]
  async fn connectivity_policy_only_falls_back_for_unavailable() {
    let server = MockServer::start().await;
    respond(&server, "GET", "/api/clients", 500, json!({ "error": "Failed to fetch clients" })).await;
    respond(&server, "GET", "/api/clients/search", 503, json!({ "error": "Database not available" }))
      .await;

    let svc = service(&server, true).with_policy(FallbackPolicy::Connectivity);
    let err = svc.fetch_all().await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to fetch clients");

    let served = svc.search("maya").await.unwrap();
    assert!(!served.is_remote());
  }

  #[tokio::test]
  async fn never_policy_surfaces_failures() {
    let server = MockServer::start().await;
    respond(&server, "GET", "/api/clients/search", 503, json!({ "error": "Database not available" }))
      .await;

    let svc = service(&server, true).with_policy(FallbackPolicy::Never);
    let err = svc.search("maya").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
  }

  #[tokio::test]
  async fn duplicate_is_surfaced_without_touching_local() {
    let server = MockServer::start().await;
    respond(&server, "POST", "/api/clients", 400, json!({
      "error": "A client with this phone number already exists"
    }))
    .await;

    let svc = service(&server, true);
    let err = svc.add(NewClient::new("Maya", "+972")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert!(svc.local().list().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn not_found_is_surfaced() {
    let server = MockServer::start().await;
    respond(&server, "DELETE", "/api/clients/x", 404, json!({ "error": "Client not found" })).await;

    let err = service(&server, true).delete(&ClientId::from("x")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[tokio::test]
  async fn auth_failure_calls_handler_and_reraises() {
    let server = MockServer::start().await;
    respond(&server, "GET", "/api/clients", 401, json!({ "error": "Invalid authentication token" }))
      .await;

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let svc = service(&server, true).with_auth_handler(move |_: &Error| {
      seen.fetch_add(1, Ordering::SeqCst);
    });

    let err = svc.fetch_all().await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn remote_fetch_refreshes_cache() {
    let server = MockServer::start().await;
    respond(&server, "GET", "/api/clients", 200, json!([{ "id": "a", "name": "A", "phone": "+1" }]))
      .await;

    let svc = service(&server, true).with_cache(OfflineCache::new(MemoryKv::new()));
    svc.fetch_all().await.unwrap();

    let cache = svc.cache().unwrap();
    assert_eq!(cache.cached_clients().await.unwrap()[0].id.as_str(), "a");
    assert!(!cache.is_stale().await.unwrap());
  }

  #[tokio::test]
  async fn local_fetch_leaves_cache_alone() {
    let server = MockServer::start().await;
    let svc = service(&server, false).with_cache(OfflineCache::new(MemoryKv::new()));
    svc.fetch_all().await.unwrap();
    assert!(svc.cache().unwrap().last_sync().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn probe_is_consulted_per_operation() {
    let server = MockServer::start().await;
    respond(&server, "GET", "/api/clients", 200, json!([])).await;

    let svc = service(&server, false);
    assert!(!svc.fetch_all().await.unwrap().is_remote());
    svc.probe.set(true);
    assert!(svc.fetch_all().await.unwrap().is_remote());
  }

  #[tokio::test]
  async fn handler_sees_the_error() {
    let server = MockServer::start().await;
    respond(&server, "PUT", "/api/clients/1", 401, json!({})).await;

    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let svc = service(&server, true).with_auth_handler(move |e: &Error| {
      sink.lock().unwrap().push(e.to_string());
    });
    let _ = svc.update(&ClientId::from("1"), ClientPatch::default()).await;
    assert_eq!(*messages.lock().unwrap(), ["Authentication required. Please log in again."]);
  }
}
