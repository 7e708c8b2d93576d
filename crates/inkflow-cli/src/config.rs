//! Settings resolution: flags and env over the TOML file over defaults.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context, Result};
use inkflow_sync::{DEFAULT_POLL_PERIOD, FallbackPolicy};
use serde::Deserialize;

pub const DEFAULT_URL: &str = "http://localhost:3001";
pub const DEFAULT_CACHE: &str = "inkflow-cache.db";

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug)]
#[serde(default)]
pub struct ConfigFile {
  pub url:          Option<String>,
  pub token:        Option<String>,
  pub fallback:     Option<FallbackPolicy>,
  pub cache:        Option<PathBuf>,
  pub poll_seconds: Option<u64>,
}

impl ConfigFile {
  pub fn load(path: &Path) -> Result<Self> {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")
  }
}

/// Values given on the command line (or through their env fallbacks).
#[derive(Debug, Default)]
pub struct Overrides {
  pub url:      Option<String>,
  pub token:    Option<String>,
  pub fallback: Option<FallbackPolicy>,
  pub cache:    Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  pub url:         String,
  pub token:       Option<String>,
  pub fallback:    FallbackPolicy,
  pub cache:       PathBuf,
  pub poll_period: Duration,
}

impl Settings {
  pub fn resolve(flags: Overrides, file: ConfigFile) -> Self {
    let non_empty = |s: String| (!s.trim().is_empty()).then_some(s);
    Self {
      url:         flags
        .url
        .or(file.url)
        .and_then(non_empty)
        .unwrap_or_else(|| DEFAULT_URL.to_owned()),
      token:       flags.token.or(file.token).and_then(non_empty),
      fallback:    flags.fallback.or(file.fallback).unwrap_or_default(),
      cache:       flags
        .cache
        .or(file.cache)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE)),
      poll_period: file
        .poll_seconds
        .filter(|s| *s > 0)
        .map_or(DEFAULT_POLL_PERIOD, Duration::from_secs),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_apply_when_nothing_is_given() {
    let s = Settings::resolve(Overrides::default(), ConfigFile::default());
    assert_eq!(s.url, DEFAULT_URL);
    assert_eq!(s.token, None);
    assert_eq!(s.fallback, FallbackPolicy::Always);
    assert_eq!(s.cache, PathBuf::from(DEFAULT_CACHE));
    assert_eq!(s.poll_period, Duration::from_secs(30));
  }

  #[test]
  fn flags_win_over_file() {
    let file: ConfigFile = toml::from_str(
      r#"
        url = "http://studio.local:3001"
        token = "from-file"
        fallback = "never"
        poll_seconds = 5
      "#,
    )
    .unwrap();
    let flags = Overrides {
      token: Some("from-flag".into()),
      fallback: Some(FallbackPolicy::Connectivity),
      ..Default::default()
    };

    let s = Settings::resolve(flags, file);
    assert_eq!(s.url, "http://studio.local:3001");
    assert_eq!(s.token.as_deref(), Some("from-flag"));
    assert_eq!(s.fallback, FallbackPolicy::Connectivity);
    assert_eq!(s.poll_period, Duration::from_secs(5));
  }

  #[test]
  fn blank_values_count_as_unset() {
    let file = ConfigFile { url: Some(" ".into()), token: Some(String::new()), ..Default::default() };
    let s = Settings::resolve(Overrides::default(), file);
    assert_eq!(s.url, DEFAULT_URL);
    assert_eq!(s.token, None);
  }

  #[test]
  fn unknown_fallback_is_rejected() {
    assert!(toml::from_str::<ConfigFile>(r#"fallback = "sometimes""#).is_err());
  }
}
