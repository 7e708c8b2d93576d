//! HTTP server for Inkflow.
//!
//! Wraps the [`inkflow_api`] router with bearer-token authentication and adds
//! the public endpoints: `/health` and the `/proxy-image` relay.

pub mod auth;
pub mod error;
pub mod proxy;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Json, Router, middleware, routing::get};
use chrono::{SecondsFormat, Utc};
use inkflow_core::store::ClientRepository;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_bearer};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `INKFLOW_*` environment variables.
#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub store_path:    PathBuf,
  /// Argon2 PHC hashes of accepted bearer tokens.
  #[serde(default)]
  pub token_hashes:  Vec<String>,
  /// Hosts the image proxy may fetch from.
  #[serde(default = "default_image_domains")]
  pub image_domains: Vec<String>,
}

pub fn default_image_domains() -> Vec<String> {
  vec!["wasenderapi.com".to_owned(), "www.wasenderapi.com".to_owned()]
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
  pub http:   reqwest::Client,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      config: self.config.clone(),
      auth:   self.auth.clone(),
      http:   self.http.clone(),
    }
  }
}

impl<S> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    let auth = AuthConfig { token_hashes: config.token_hashes.clone() };
    Self {
      store:  Arc::new(store),
      config: Arc::new(config),
      auth:   Arc::new(auth),
      http:   reqwest::Client::new(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ClientRepository + 'static,
{
  let api = inkflow_api::api_router(state.store.clone())
    .layer(middleware::from_fn_with_state(state.auth.clone(), require_bearer));

  Router::new()
    .route("/health",      get(health))
    .route("/proxy-image", get(proxy::handler::<S>))
    .with_state(state)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

/// `GET /health`: unauthenticated liveness check.
async fn health() -> Json<Value> {
  Json(json!({
    "status":    "OK",
    "database":  "Connected",
    "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
  }))
}

// ─── Integration tests ────────────────────────────────────────────────────────
