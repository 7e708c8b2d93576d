//! Error type for `inkflow-sync`.

use inkflow_core::{Classify, ErrorKind};
use thiserror::Error;

/// Message carried by every 401 from the backend, whatever its body said.
pub const AUTH_REQUIRED: &str = "Authentication required. Please log in again.";

#[derive(Debug, Error)]
pub enum Error {
  #[error("{}", AUTH_REQUIRED)]
  Unauthorized,

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Duplicate(String),

  #[error("{0}")]
  Validation(String),

  /// Any other non-2xx response. `message` is the server's `error` field
  /// when present.
  #[error("{message}")]
  Http { status: u16, message: String },

  #[error("Network error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("invalid base URL `{url}`: {reason}")]
  BaseUrl { url: String, reason: String },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Core(#[from] inkflow_core::Error),

  #[error("cache error: {0}")]
  Cache(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn cache<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Cache(Box::new(e))
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Unauthorized => ErrorKind::Unauthorized,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::Duplicate(_) => ErrorKind::Duplicate,
      Self::Validation(_) => ErrorKind::Validation,
      Self::Transport(e) if e.is_decode() => ErrorKind::Other,
      Self::Http { status: 503, .. } | Self::Transport(_) => ErrorKind::Unavailable,
      Self::Core(e) => e.kind(),
      Self::Http { .. } | Self::BaseUrl { .. } | Self::Json(_) | Self::Cache(_) => ErrorKind::Other,
    }
  }
}
