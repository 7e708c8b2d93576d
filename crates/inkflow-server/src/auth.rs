//! Bearer-token verification for the `/api` routes.
//!
//! Tokens are issued elsewhere; this server only holds argon2 PHC hashes of
//! the tokens it accepts.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use rand_core::OsRng;
use tracing::error;

use crate::error::Error;

/// Tokens accepted as valid for this server instance.
#[derive(Clone, Default)]
pub struct AuthConfig {
  /// PHC strings produced by argon2, e.g. `$argon2id$v=19$…`
  pub token_hashes: Vec<String>,
}

/// Hash `token` into the PHC string stored in `token_hashes`.
pub fn hash_token(token: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(token.as_bytes(), &salt)?.to_string())
}

/// Verify the bearer token in `headers` against every configured hash.
pub fn verify_bearer(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let token = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or(Error::MissingToken)?;

  let accepted = config.token_hashes.iter().any(|hash| {
    PasswordHash::new(hash)
      .map(|parsed| Argon2::default().verify_password(token.as_bytes(), &parsed).is_ok())
      .unwrap_or(false)
  });

  if accepted {
    Ok(())
  } else {
    error!("rejected bearer token");
    Err(Error::InvalidToken)
  }
}

/// Middleware guarding everything nested under it.
pub async fn require_bearer(
  State(auth): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Result<Response, Error> {
  verify_bearer(req.headers(), &auth)?;
  Ok(next.run(req).await)
}
