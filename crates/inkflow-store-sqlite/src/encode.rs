//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with fixed nanosecond precision
//! and a `Z` suffix, so lexical order equals chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use inkflow_core::{
  client::{Client, ClientId},
  normalize::normalize_value,
};
use serde_json::Value;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Search ──────────────────────────────────────────────────────────────────

/// A `LIKE` pattern matching `query` anywhere, with `%`, `_` and the escape
/// character itself taken literally. Use with `ESCAPE '\'`.
pub fn like_pattern(query: &str) -> String {
  let mut out = String::with_capacity(query.len() + 2);
  out.push('%');
  for ch in query.chars() {
    if matches!(ch, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(ch);
  }
  out.push('%');
  out
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values derived from a normalized client.
pub struct ClientColumns {
  pub id:         String,
  pub name:       String,
  pub phone:      String,
  pub email:      Option<String>,
  pub ai_active:  String,
  pub created_at: String,
  pub updated_at: String,
}

impl ClientColumns {
  pub fn of(client: &Client) -> Self {
    Self {
      id:         client.id.to_string(),
      name:       client.name.clone(),
      phone:      client.phone.clone(),
      email:      client.email.clone(),
      ai_active:  client.ai_active.to_string(),
      created_at: encode_dt(client.created_at),
      updated_at: encode_dt(client.updated_at),
    }
  }
}

/// Raw strings read directly from a `clients` row.
pub struct RawClientRow {
  pub id:         String,
  pub created_at: String,
  pub updated_at: String,
  pub document:   String,
}

/// Column list matching [`RawClientRow::from_row`].
pub const ROW_COLUMNS: &str = "id, created_at, updated_at, document";

impl RawClientRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      created_at: row.get(1)?,
      updated_at: row.get(2)?,
      document:   row.get(3)?,
    })
  }

  /// Normalize the stored document. The row's own identity and timestamps
  /// are authoritative over whatever the document carries.
  pub fn into_client(self) -> Result<Client> {
    let mut doc: Value = serde_json::from_str(&self.document)?;
    if let Value::Object(fields) = &mut doc {
      fields.insert("id".to_owned(), Value::String(self.id.clone()));
    }
    let mut client = normalize_value(doc)?;
    client.id = ClientId::from(self.id);
    client.created_at = decode_dt(&self.created_at)?;
    client.updated_at = decode_dt(&self.updated_at)?;
    Ok(client)
  }
}
