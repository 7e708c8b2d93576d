//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum Error {
  /// No `Authorization: Bearer <token>` header.
  #[error("Authentication required")]
  MissingToken,
  #[error("Invalid authentication token")]
  InvalidToken,
  #[error("Invalid image URL")]
  InvalidImageUrl(String),
  #[error("Domain not allowed")]
  DomainNotAllowed(String),
  #[error("Failed to fetch image")]
  Upstream(StatusCode),
  #[error("Failed to proxy image")]
  Proxy(#[from] reqwest::Error),
}

impl Error {
  pub fn status(&self) -> StatusCode {
    match self {
      Error::MissingToken | Error::InvalidToken => StatusCode::UNAUTHORIZED,
      Error::InvalidImageUrl(_) => StatusCode::BAD_REQUEST,
      Error::DomainNotAllowed(_) => StatusCode::FORBIDDEN,
      Error::Upstream(status) => *status,
      Error::Proxy(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      Error::MissingToken => json!({
        "error":   self.to_string(),
        "message": "Authorization header with Bearer token required",
      }),
      Error::InvalidImageUrl(details) => json!({ "error": self.to_string(), "details": details }),
      Error::DomainNotAllowed(host) => {
        warn!(%host, "image proxy refused host");
        json!({ "error": self.to_string() })
      }
      Error::Upstream(status) => json!({
        "error":   self.to_string(),
        "details": format!("upstream returned {}", status.as_u16()),
      }),
      Error::Proxy(e) => json!({ "error": self.to_string(), "details": e.to_string() }),
      Error::InvalidToken => json!({ "error": self.to_string() }),
    };

    let mut res = (status, Json(body)).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer realm=\"inkflow\""));
    }
    res
  }
}
