//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use inkflow_core::{Classify, ErrorKind};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

impl FieldError {
  pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self { field: field.into(), message: message.into() }
  }
}

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Client not found")]
  NotFound,

  #[error("{0}")]
  BadRequest(String),

  #[error("Validation failed")]
  Validation(Vec<FieldError>),

  #[error("Database not available")]
  Unavailable,

  /// Any other store failure. `context` is the message shown to callers;
  /// the source is only logged.
  #[error("{context}: {source}")]
  Store {
    context: &'static str,
    #[source]
    source:  Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  /// Map a store error onto the HTTP taxonomy. `context` names the failed
  /// operation for errors with no more specific status.
  pub fn from_store<E>(context: &'static str, e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    match e.kind() {
      ErrorKind::NotFound => Self::NotFound,
      ErrorKind::Duplicate => Self::BadRequest(e.to_string()),
      ErrorKind::Validation => Self::BadRequest(e.to_string()),
      ErrorKind::Unavailable => Self::Unavailable,
      ErrorKind::Unauthorized | ErrorKind::Other => {
        Self::Store { context, source: Box::new(e) }
      }
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::NotFound => StatusCode::NOT_FOUND,
      Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
      Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
      Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::Validation(vec![FieldError::new("body", rejection.body_text())])
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    Self::Validation(vec![FieldError::new("query", rejection.body_text())])
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match self {
      Self::Validation(details) => json!({ "error": "Validation failed", "details": details }),
      Self::Store { context, source } => {
        error!(error = %source, "{context}");
        json!({ "error": context })
      }
      other => json!({ "error": other.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}
