//! Error type for `inkflow-store-sqlite`.

use inkflow_core::{Classify, ErrorKind, client::ClientId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] inkflow_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("Client not found: {0}")]
  NotFound(ClientId),

  #[error("A client with this phone number already exists")]
  DuplicatePhone(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::DuplicatePhone(_) => ErrorKind::Duplicate,
      Self::Database(_) | Self::Json(_) | Self::DateParse(_) => ErrorKind::Other,
    }
  }
}
