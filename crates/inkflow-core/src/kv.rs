//! Minimal key-value persistence used by the device-side cache.
//!
//! Values are whole strings; every write replaces the previous value and the
//! last writer wins.

use std::future::Future;

pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove every key.
  fn clear(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
