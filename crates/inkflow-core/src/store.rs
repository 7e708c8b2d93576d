//! The `ClientRepository` trait: the seam every data source sits behind.
//!
//! Implemented by the SQLite backend (`inkflow-store-sqlite`), the remote HTTP
//! client and the in-process fallback store (`inkflow-sync`). Higher layers
//! (the REST API, the orchestrator) depend on this abstraction only.

use std::future::Future;

use crate::{
  client::{AutomationStatus, Client, ClientId, ClientPatch, NewClient},
  error::Classify,
};

/// Abstraction over a client record store.
///
/// Listing and search results are ordered newest-first by `created_at`.
/// All methods return `Send` futures so implementations can be shared across
/// tokio tasks and axum handlers.
pub trait ClientRepository: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// Every client, newest first.
  fn list(&self) -> impl Future<Output = Result<Vec<Client>, Self::Error>> + Send + '_;

  /// Create a client. Fails with a duplicate error if a client with exactly
  /// the same phone number exists; the store is left unchanged in that case.
  fn create(
    &self,
    input: NewClient,
  ) -> impl Future<Output = Result<Client, Self::Error>> + Send + '_;

  /// Apply `patch` to the client with `id`. Fails with not-found for an
  /// unknown id. Phone uniqueness is not re-checked here.
  fn update<'a>(
    &'a self,
    id: &'a ClientId,
    patch: ClientPatch,
  ) -> impl Future<Output = Result<Client, Self::Error>> + Send + 'a;

  /// Hard-delete the client with `id`. Fails with not-found for an unknown id.
  fn delete<'a>(
    &'a self,
    id: &'a ClientId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The client whose phone is exactly `phone`, if any.
  fn find_by_phone<'a>(
    &'a self,
    phone: &'a str,
  ) -> impl Future<Output = Result<Option<Client>, Self::Error>> + Send + 'a;

  /// Clients matching free-text `query`.
  fn search<'a>(
    &'a self,
    query: &'a str,
  ) -> impl Future<Output = Result<Vec<Client>, Self::Error>> + Send + 'a;

  /// Clients whose automation flag equals `status`.
  fn by_automation_status(
    &self,
    status: AutomationStatus,
  ) -> impl Future<Output = Result<Vec<Client>, Self::Error>> + Send + '_;
}

/// Sort newest-first by creation time; ties keep their relative order.
pub fn sort_newest_first(clients: &mut [Client]) {
  clients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
