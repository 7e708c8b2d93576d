//! [`SqliteStore`]: the SQLite implementation of [`ClientRepository`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, functions::FunctionFlags};
use serde_json::Value;
use tracing::{debug, warn};

use inkflow_core::{
  client::{AutomationStatus, Client, ClientId, ClientPatch, NewClient},
  normalize::normalize_value,
  store::ClientRepository,
};

use crate::{
  Error, Result,
  encode::{ClientColumns, ROW_COLUMNS, RawClientRow, like_pattern},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A client repository backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        register_functions(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Store a document exactly as an external writer produced it, in either
  /// naming convention. A missing identifier is assigned as `_id`. No
  /// uniqueness check is made; the automation pipeline owns its own records.
  pub async fn insert_raw(&self, mut document: Value) -> Result<Client> {
    if let Value::Object(fields) = &mut document {
      let has_id = ["id", "_id"]
        .iter()
        .any(|k| fields.get(*k).is_some_and(|v| !v.is_null()));
      if !has_id {
        fields.insert("_id".to_owned(), Value::String(ClientId::generate().to_string()));
      }
    }

    let client = normalize_value(document.clone())?;
    let cols = ClientColumns::of(&client);
    let doc = document.to_string();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO clients (id, name, phone, email, ai_active, created_at, updated_at, document)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            cols.id, cols.name, cols.phone, cols.email,
            cols.ai_active, cols.created_at, cols.updated_at, doc
          ],
        )?;
        Ok(())
      })
      .await?;

    debug!(id = %client.id, "inserted raw client document");
    Ok(client)
  }

  async fn fetch_one(&self, id: &ClientId) -> Result<Option<Client>> {
    let id_str = id.to_string();
    let raw: Option<RawClientRow> = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            &format!("SELECT {ROW_COLUMNS} FROM clients WHERE id = ?1"),
            rusqlite::params![id_str],
            RawClientRow::from_row,
          )
          .optional()?;
        Ok(row)
      })
      .await?;
    raw.map(RawClientRow::into_client).transpose()
  }

  /// Run a `SELECT {ROW_COLUMNS} ...` statement and normalize every row.
  /// Rows whose document can no longer be read are skipped with a warning.
  async fn fetch_many(&self, sql: String, param: Option<String>) -> Result<Vec<Client>> {
    let rows: Vec<RawClientRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match param {
          Some(p) => stmt
            .query_map(rusqlite::params![p], RawClientRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map([], RawClientRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    let mut clients = Vec::with_capacity(rows.len());
    for row in rows {
      let id = row.id.clone();
      match row.into_client() {
        Ok(client) => clients.push(client),
        Err(e) => warn!(%id, error = %e, "skipping unreadable client row"),
      }
    }
    Ok(clients)
  }

  async fn write_back(&self, client: &Client) -> Result<bool> {
    let cols = ClientColumns::of(client);
    let doc = serde_json::to_string(client)?;

    let changed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE clients
           SET name = ?2, phone = ?3, email = ?4, ai_active = ?5,
               updated_at = ?6, document = ?7
           WHERE id = ?1",
          rusqlite::params![
            cols.id, cols.name, cols.phone, cols.email,
            cols.ai_active, cols.updated_at, doc
          ],
        )?;
        Ok(n)
      })
      .await?;
    Ok(changed > 0)
  }
}

/// SQLite's own `lower()` and `LIKE` fold ASCII only; search needs full
/// Unicode case folding for names like "Élodie".
fn register_functions(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "unicode_lower",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
  )
}

// ─── ClientRepository impl ───────────────────────────────────────────────────

impl ClientRepository for SqliteStore {
  type Error = Error;

  async fn list(&self) -> Result<Vec<Client>> {
    self
      .fetch_many(
        format!("SELECT {ROW_COLUMNS} FROM clients ORDER BY created_at DESC, rowid DESC"),
        None,
      )
      .await
  }

  async fn create(&self, input: NewClient) -> Result<Client> {
    let client = input.into_client(ClientId::generate(), Utc::now());
    let cols = ClientColumns::of(&client);
    let doc = serde_json::to_string(&client)?;

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken: bool = tx
          .query_row(
            "SELECT 1 FROM clients WHERE phone = ?1 LIMIT 1",
            rusqlite::params![cols.phone],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO clients (id, name, phone, email, ai_active, created_at, updated_at, document)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            cols.id, cols.name, cols.phone, cols.email,
            cols.ai_active, cols.created_at, cols.updated_at, doc
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicatePhone(client.phone));
    }
    debug!(id = %client.id, "created client");
    Ok(client)
  }

  async fn update<'a>(&'a self, id: &'a ClientId, patch: ClientPatch) -> Result<Client> {
    let mut client = self
      .fetch_one(id)
      .await?
      .ok_or_else(|| Error::NotFound(id.clone()))?;

    client.apply(patch, Utc::now());

    if !self.write_back(&client).await? {
      return Err(Error::NotFound(id.clone()));
    }
    Ok(client)
  }

  async fn delete<'a>(&'a self, id: &'a ClientId) -> Result<()> {
    let id_str = id.to_string();
    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute("DELETE FROM clients WHERE id = ?1", rusqlite::params![id_str])?;
        Ok(n)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::NotFound(id.clone()));
    }
    Ok(())
  }

  async fn find_by_phone<'a>(&'a self, phone: &'a str) -> Result<Option<Client>> {
    let mut found = self
      .fetch_many(
        format!(
          "SELECT {ROW_COLUMNS} FROM clients WHERE phone = ?1 \
           ORDER BY created_at DESC, rowid DESC LIMIT 1"
        ),
        Some(phone.to_owned()),
      )
      .await?;
    Ok(found.pop())
  }

  async fn search<'a>(&'a self, query: &'a str) -> Result<Vec<Client>> {
    self
      .fetch_many(
        format!(
          "SELECT {ROW_COLUMNS} FROM clients
           WHERE unicode_lower(name)  LIKE ?1 ESCAPE '\\'
              OR phone                LIKE ?1 ESCAPE '\\'
              OR unicode_lower(email) LIKE ?1 ESCAPE '\\'
           ORDER BY created_at DESC, rowid DESC"
        ),
        Some(like_pattern(&query.trim().to_lowercase())),
      )
      .await
  }

  async fn by_automation_status(&self, status: AutomationStatus) -> Result<Vec<Client>> {
    self
      .fetch_many(
        format!(
          "SELECT {ROW_COLUMNS} FROM clients WHERE ai_active = ?1 \
           ORDER BY created_at DESC, rowid DESC"
        ),
        Some(status.to_string()),
      )
      .await
  }
}
