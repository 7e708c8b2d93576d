//! Error types for `inkflow-core`, plus the shared error taxonomy every store
//! and transport in the workspace maps its own errors onto.

use thiserror::Error;

use crate::client::ClientId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Client not found: {0}")]
  NotFound(ClientId),

  #[error("A client with this phone number already exists")]
  DuplicatePhone(String),

  #[error("record has neither `id` nor `_id`")]
  MissingId,

  #[error("record is not a JSON object")]
  NotAnObject,

  #[error("invalid image payload: {0}")]
  ImagePayload(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Taxonomy ────────────────────────────────────────────────────────────────

/// The coarse category of a failure, used to decide between surfacing an
/// error, falling back to a local store, or forcing re-authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The credential is missing, invalid or expired.
  Unauthorized,
  NotFound,
  /// Creation rejected because the phone number is already taken.
  Duplicate,
  /// Input rejected by validation.
  Validation,
  /// The backend could not be reached, or reported itself unavailable.
  Unavailable,
  Other,
}

/// Implemented by every error type that flows through a
/// [`ClientRepository`](crate::store::ClientRepository).
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::DuplicatePhone(_) => ErrorKind::Duplicate,
      Self::MissingId | Self::NotAnObject | Self::ImagePayload(_) => ErrorKind::Validation,
      Self::Serialization(_) => ErrorKind::Other,
    }
  }
}

impl Classify for std::convert::Infallible {
  fn kind(&self) -> ErrorKind { match *self {} }
}
