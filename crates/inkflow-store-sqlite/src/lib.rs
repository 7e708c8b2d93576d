//! SQLite backend for the Inkflow client store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Two stores live here: [`SqliteStore`],
//! the server-side client repository, and [`SqliteKv`], the device-side
//! key-value persistence behind the offline cache.

mod encode;
mod kv;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use kv::SqliteKv;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
