//! Handlers for `/clients` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/clients` | Newest first |
//! | `POST`   | `/clients` | 201; 400 on duplicate phone or validation |
//! | `PUT`    | `/clients/:id` | 404 if not found; `id`/`createdAt` ignored |
//! | `DELETE` | `/clients/:id` | 404 if not found |
//! | `GET`    | `/clients/search?q=` | 400 on missing or over-long query |

use std::sync::Arc;

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use inkflow_core::{
  client::{Client, ClientId, ClientPatch, NewClient},
  store::ClientRepository,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{error::ApiError, validate};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /clients`
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<Vec<Client>>, ApiError>
where
  S: ClientRepository,
{
  let clients = store
    .list()
    .await
    .map_err(|e| ApiError::from_store("Failed to fetch clients", e))?;
  Ok(Json(clients))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /clients`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  body: Result<Json<NewClient>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ClientRepository,
{
  let Json(input) = body?;
  validate::new_client(&input)?;

  let client = store
    .create(input)
    .await
    .map_err(|e| ApiError::from_store("Failed to create client", e))?;
  info!(id = %client.id, "client created");
  Ok((StatusCode::CREATED, Json(client)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /clients/:id`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  body: Result<Json<ClientPatch>, JsonRejection>,
) -> Result<Json<Client>, ApiError>
where
  S: ClientRepository,
{
  let Json(patch) = body?;
  validate::patch(&patch)?;

  let id = ClientId::from(id);
  let client = store
    .update(&id, patch)
    .await
    .map_err(|e| ApiError::from_store("Failed to update client", e))?;
  Ok(Json(client))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /clients/:id`
pub async fn delete<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ClientRepository,
{
  let id = ClientId::from(id);
  store
    .delete(&id)
    .await
    .map_err(|e| ApiError::from_store("Failed to delete client", e))?;
  info!(%id, "client deleted");
  Ok(Json(json!({ "message": "Client deleted successfully" })))
}

// ─── Search ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
  pub q: Option<String>,
}

/// `GET /clients/search?q=<text>`: case-insensitive match on name, phone or
/// email.
pub async fn search<S>(
  State(store): State<Arc<S>>,
  params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Client>>, ApiError>
where
  S: ClientRepository,
{
  let Query(params) = params?;
  let q = validate::search_query(params.q.as_deref())?;

  let clients = store
    .search(q)
    .await
    .map_err(|e| ApiError::from_store("Failed to search clients", e))?;
  Ok(Json(clients))
}
