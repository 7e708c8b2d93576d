//! [`SqliteKv`]: durable device-side key-value storage.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use inkflow_core::kv::KeyValueStore;

use crate::{Error, Result, encode::encode_dt, schema::SCHEMA};

/// Whole-value string storage in the `kv` table.
#[derive(Clone)]
pub struct SqliteKv {
  conn: tokio_rusqlite::Connection,
}

impl SqliteKv {
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn })
  }
}

impl KeyValueStore for SqliteKv {
  type Error = Error;

  async fn get<'a>(&'a self, key: &'a str) -> Result<Option<String>> {
    let key = key.to_owned();
    let value = self
      .conn
      .call(move |conn| {
        let v = conn
          .query_row("SELECT value FROM kv WHERE key = ?1", rusqlite::params![key], |r| {
            r.get::<_, String>(0)
          })
          .optional()?;
        Ok(v)
      })
      .await?;
    Ok(value)
  }

  async fn set<'a>(&'a self, key: &'a str, value: String) -> Result<()> {
    let key = key.to_owned();
    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
          rusqlite::params![key, value, now],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove<'a>(&'a self, key: &'a str) -> Result<()> {
    let key = key.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn clear(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute("DELETE FROM kv", [])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
