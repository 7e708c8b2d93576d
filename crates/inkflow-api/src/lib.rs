//! JSON REST API for Inkflow.
//!
//! Exposes an axum [`Router`] backed by any
//! [`inkflow_core::store::ClientRepository`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", inkflow_api::api_router(store.clone()))
//! ```

pub mod clients;
pub mod error;
pub mod validate;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, put},
};
use inkflow_core::store::ClientRepository;

pub use error::{ApiError, FieldError};

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ClientRepository + 'static,
{
  Router::new()
    .route("/clients", get(clients::list::<S>).post(clients::create::<S>))
    .route("/clients/search", get(clients::search::<S>))
    .route("/clients/{id}", put(clients::update::<S>).delete(clients::delete::<S>))
    .with_state(store)
}

// ─── Integration tests ────────────────────────────────────────────────────────
