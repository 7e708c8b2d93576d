//! `GET /proxy-image?url=`: relays reference photos from the messaging
//! provider so browsers can display them without cross-origin failures.

use axum::{
  body::Body,
  extract::{Query, State},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use inkflow_core::store::ClientRepository;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::{AppState, error::Error};

pub const CACHE_CONTROL: &str = "public, max-age=86400";

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
  pub url: Option<String>,
}

/// Parse `raw` and check its host against `allowed`.
pub fn check_url(raw: Option<&str>, allowed: &[String]) -> Result<Url, Error> {
  let raw = raw
    .filter(|s| !s.trim().is_empty())
    .ok_or_else(|| Error::InvalidImageUrl("Valid URL is required".to_owned()))?;
  let url = Url::parse(raw.trim()).map_err(|e| Error::InvalidImageUrl(e.to_string()))?;
  if !matches!(url.scheme(), "http" | "https") {
    return Err(Error::InvalidImageUrl(format!("unsupported scheme `{}`", url.scheme())));
  }
  let host = url
    .host_str()
    .ok_or_else(|| Error::InvalidImageUrl("URL has no host".to_owned()))?;
  if !allowed.iter().any(|d| d.eq_ignore_ascii_case(host)) {
    return Err(Error::DomainNotAllowed(host.to_owned()));
  }
  Ok(url)
}

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ProxyParams>,
) -> Result<Response, Error>
where
  S: ClientRepository + 'static,
{
  let url = check_url(params.url.as_deref(), &state.config.image_domains)?;
  debug!(%url, "proxying image");

  let upstream = state.http.get(url).send().await?;
  let status = upstream.status();
  if !status.is_success() {
    let relayed = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    return Err(Error::Upstream(relayed));
  }

  let content_type = upstream
    .headers()
    .get(reqwest::header::CONTENT_TYPE)
    .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok())
    .unwrap_or_else(|| HeaderValue::from_static("image/jpeg"));

  let mut res = Body::from_stream(upstream.bytes_stream()).into_response();
  let headers = res.headers_mut();
  headers.insert(header::CONTENT_TYPE, content_type);
  headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
  Ok(res)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn allowed() -> Vec<String> { vec!["wasenderapi.com".to_owned(), "www.wasenderapi.com".to_owned()] }

  #[test]
  fn accepts_allow_listed_hosts() {
    let url = check_url(Some("https://www.wasenderapi.com/media/a.jpg"), &allowed()).unwrap();
    assert_eq!(url.host_str(), Some("www.wasenderapi.com"));
  }

  #[test]
  fn rejects_other_hosts() {
    assert!(matches!(
      check_url(Some("https://evil.example/a.jpg"), &allowed()),
      Err(Error::DomainNotAllowed(_))
    ));
    // Suffix tricks do not pass.
    assert!(matches!(
      check_url(Some("https://wasenderapi.com.evil.example/a.jpg"), &allowed()),
      Err(Error::DomainNotAllowed(_))
    ));
  }

  #[test]
  fn rejects_invalid_urls() {
    assert!(matches!(check_url(None, &allowed()), Err(Error::InvalidImageUrl(_))));
    assert!(matches!(check_url(Some("not a url"), &allowed()), Err(Error::InvalidImageUrl(_))));
    assert!(matches!(
      check_url(Some("ftp://wasenderapi.com/a.jpg"), &allowed()),
      Err(Error::InvalidImageUrl(_))
    ));
  }
}
