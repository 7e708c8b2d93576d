//! [`RemoteStore`]: the REST API client, implementing [`ClientRepository`].
//!
//! Every response record goes through the field normalizer, so records the
//! automation pipeline wrote straight into the backing database come back in
//! canonical form.

use std::time::Duration;

use inkflow_core::{
  client::{AutomationStatus, Client, ClientId, ClientPatch, NewClient},
  normalize::{normalize_all, normalize_value},
  store::ClientRepository,
};
use reqwest::{Method, RequestBuilder, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
  Error, Result,
  auth::{StaticToken, TokenProvider},
};

/// Overall bound on a single API request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Append path `segments` to `base`, percent-encoding each one.
pub(crate) fn join_url(base: &str, segments: &[&str]) -> Result<Url> {
  let bad = |reason: String| Error::BaseUrl { url: base.to_owned(), reason };
  let mut url = Url::parse(base).map_err(|e| bad(e.to_string()))?;
  url
    .path_segments_mut()
    .map_err(|()| bad("cannot be a base".to_owned()))?
    .pop_if_empty()
    .extend(segments);
  Ok(url)
}

/// Async HTTP client for the Inkflow JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RemoteStore<T = StaticToken> {
  http:   reqwest::Client,
  base:   String,
  tokens: T,
}

impl<T: TokenProvider> RemoteStore<T> {
  pub fn new(base_url: impl Into<String>, tokens: T) -> Result<Self> {
    let base = base_url.into();
    join_url(&base, &[])?;
    let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    Ok(Self { http, base, tokens })
  }

  pub fn base_url(&self) -> &str { &self.base }

  fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
    let mut all = vec!["api", "clients"];
    all.extend_from_slice(segments);
    Ok(self.http.request(method, join_url(&self.base, &all)?))
  }

  /// Attach the bearer token, send, and decode the JSON body.
  async fn send(&self, req: RequestBuilder) -> Result<Value> {
    let req = match self.tokens.token().await {
      Some(token) => req.bearer_auth(token),
      None => req,
    };
    let resp = req.send().await?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp.json().await?);
    }

    let status = status.as_u16();
    let body: Option<Value> = resp.json().await.ok();
    let message = body
      .as_ref()
      .and_then(|b| b.get("error"))
      .and_then(Value::as_str)
      .map(str::to_owned)
      .unwrap_or_else(|| format!("HTTP error! status: {status}"));
    debug!(status, %message, "remote request failed");

    Err(match status {
      401 => Error::Unauthorized,
      404 => Error::NotFound(message),
      400 if message.contains("already exists") => Error::Duplicate(message),
      400 => Error::Validation(message),
      _ => Error::Http { status, message },
    })
  }

  async fn send_one(&self, req: RequestBuilder) -> Result<Client> {
    Ok(normalize_value(self.send(req).await?)?)
  }

  async fn send_many(&self, req: RequestBuilder) -> Result<Vec<Client>> {
    let values: Vec<Value> = serde_json::from_value(self.send(req).await?)?;
    let (clients, rejected) = normalize_all(values);
    for e in rejected {
      warn!(error = %e, "dropping record the server returned");
    }
    Ok(clients)
  }
}

// ─── ClientRepository impl ───────────────────────────────────────────────────

impl<T: TokenProvider> ClientRepository for RemoteStore<T> {
  type Error = Error;

  async fn list(&self) -> Result<Vec<Client>> {
    self.send_many(self.request(Method::GET, &[])?).await
  }

  async fn create(&self, input: NewClient) -> Result<Client> {
    let req = self.request(Method::POST, &[])?.json(&input);
    self.send_one(req).await
  }

  async fn update<'a>(&'a self, id: &'a ClientId, patch: ClientPatch) -> Result<Client> {
    let req = self.request(Method::PUT, &[id.as_str()])?.json(&patch);
    self.send_one(req).await
  }

  async fn delete<'a>(&'a self, id: &'a ClientId) -> Result<()> {
    self.send(self.request(Method::DELETE, &[id.as_str()])?).await?;
    Ok(())
  }

  /// Search by the phone, then keep only the exact match.
  async fn find_by_phone<'a>(&'a self, phone: &'a str) -> Result<Option<Client>> {
    let found = self.search(phone).await?;
    Ok(found.into_iter().find(|c| c.phone == phone))
  }

  async fn search<'a>(&'a self, query: &'a str) -> Result<Vec<Client>> {
    let req = self.request(Method::GET, &["search"])?.query(&[("q", query)]);
    self.send_many(req).await
  }

  /// The API has no status filter; list and filter here.
  async fn by_automation_status(&self, status: AutomationStatus) -> Result<Vec<Client>> {
    let all = self.list().await?;
    Ok(all.into_iter().filter(|c| c.ai_active == status).collect())
  }
}
