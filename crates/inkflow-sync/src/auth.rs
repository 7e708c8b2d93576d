//! Credentials for the remote API and the hook invoked when they are
//! rejected.

use std::future::Future;

use inkflow_core::{Classify, ErrorKind};
use tracing::error;

use crate::Error;

/// Supplies the bearer token for each remote call. Called once per request so
/// that refreshed tokens are picked up.
pub trait TokenProvider: Send + Sync {
  fn token(&self) -> impl Future<Output = Option<String>> + Send + '_;
}

/// A fixed token, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl StaticToken {
  pub fn new(token: impl Into<String>) -> Self { Self(Some(token.into())) }
}

impl TokenProvider for StaticToken {
  async fn token(&self) -> Option<String> { self.0.clone() }
}

/// Invoked when the remote rejects the credential, before the error is
/// returned to the caller.
pub trait AuthErrorHandler: Send + Sync {
  fn handle(&self, error: &Error);
}

/// Logs the rejection and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuthErrors;

impl AuthErrorHandler for LogAuthErrors {
  fn handle(&self, e: &Error) {
    error!(error = %e, "authentication error");
  }
}

impl<F> AuthErrorHandler for F
where
  F: Fn(&Error) + Send + Sync,
{
  fn handle(&self, error: &Error) { self(error) }
}

/// A message suitable for showing to the person at the keyboard.
pub fn friendly_message(e: &Error) -> String {
  let message = e.to_string();
  if message.contains("Invalid authentication token") || message.contains("Token expired") {
    return "Your session has expired. Please log in again.".to_owned();
  }
  if message.contains("Authentication required") {
    return "Please log in to continue.".to_owned();
  }
  if matches!(e, Error::Http { status: 429, .. }) || message.contains("Too many requests") {
    return "Too many requests. Please try again in a few minutes.".to_owned();
  }
  if e.kind() == ErrorKind::Validation || message.contains("Validation failed") {
    return "Please check your input and try again.".to_owned();
  }
  if matches!(e, Error::Transport(_)) || message.contains("Network error") {
    return "Network error. Please check your connection and try again.".to_owned();
  }
  message
}
