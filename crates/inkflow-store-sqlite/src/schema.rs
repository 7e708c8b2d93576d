//! SQL schema for the Inkflow SQLite stores.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per client. `document` holds the JSON exactly as written, in
-- either naming convention; the other columns are derived from the
-- normalized record for lookup and ordering.
CREATE TABLE IF NOT EXISTS clients (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    phone       TEXT NOT NULL,   -- unique on creation only, so no constraint
    email       TEXT,
    ai_active   TEXT NOT NULL,   -- 'completed' | 'error' | 'pending' | 'in_progress'
    created_at  TEXT NOT NULL,   -- RFC 3339, fixed nanosecond precision
    updated_at  TEXT NOT NULL,
    document    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS clients_phone_idx   ON clients(phone);
CREATE INDEX IF NOT EXISTS clients_created_idx ON clients(created_at);

-- Device-side key-value cache. Whole-value replace; last writer wins.
CREATE TABLE IF NOT EXISTS kv (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

PRAGMA user_version = 1;
";
