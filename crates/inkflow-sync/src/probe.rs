//! Availability probes: decide, before every operation, whether the remote
//! API should be tried at all.

use std::{
  future::Future,
  sync::atomic::{AtomicBool, Ordering},
  time::Duration,
};

use reqwest::Url;
use tracing::debug;

use crate::Result;

/// Default bound on a single health request.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub trait AvailabilityProbe: Send + Sync {
  /// Never fails: anything other than a 2xx answer means unavailable.
  fn is_available(&self) -> impl Future<Output = bool> + Send + '_;
}

/// `GET {base}/health` without credentials.
#[derive(Debug, Clone)]
pub struct HttpProbe {
  http:   reqwest::Client,
  health: Url,
}

impl HttpProbe {
  pub fn new(base_url: &str) -> Result<Self> { Self::with_timeout(base_url, PROBE_TIMEOUT) }

  pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
    let health = crate::remote::join_url(base_url, &["health"])?;
    let http = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { http, health })
  }
}

impl AvailabilityProbe for HttpProbe {
  async fn is_available(&self) -> bool {
    match self.http.get(self.health.clone()).send().await {
      Ok(resp) => {
        let up = resp.status().is_success();
        debug!(status = %resp.status(), up, "health probe");
        up
      }
      Err(e) => {
        debug!(error = %e, "health probe failed");
        false
      }
    }
  }
}

/// A probe whose answer is set by hand. Used for an explicit offline mode and
/// in tests.
#[derive(Debug, Default)]
pub struct FixedProbe(AtomicBool);

impl FixedProbe {
  pub fn new(available: bool) -> Self { Self(AtomicBool::new(available)) }

  pub fn set(&self, available: bool) { self.0.store(available, Ordering::Relaxed); }
}

impl AvailabilityProbe for FixedProbe {
  async fn is_available(&self) -> bool { self.0.load(Ordering::Relaxed) }
}
