//! Version-gated migrations for app.db.
//!
//! Each migration checks the recorded schema version, runs inside a
//! transaction, and records its version in `db_version`. New databases run
//! every step once; existing ones only pick up the steps they are missing.

use chrono::Utc;
use rusqlite::{Connection, Result, params};

/// Current schema version for app.db
/// Increment this when adding a new migration
pub const APP_DB_VERSION: i32 = 3;

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Bootstrap: ensure db_version table exists (needed to check version)
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS db_version (
      version INTEGER PRIMARY KEY,
      applied_at TEXT NOT NULL,
      description TEXT
    );
    "#,
  )?;

  let current_version = get_schema_version(conn)?;
  tracing::debug!("app.db schema version: {}", current_version);

  if current_version < 1 {
    migrate_v0_to_v1(conn)?;
  }
  if current_version < 2 {
    migrate_v1_to_v2(conn)?;
  }
  if current_version < 3 {
    migrate_v2_to_v3(conn)?;
  }

  Ok(())
}

/// v0→v1: Sessions
fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
  tracing::info!("Running migration v0→v1: Create sessions table");
  let tx = conn.unchecked_transaction()?;
  tx.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
      id_hash TEXT PRIMARY KEY,
      email TEXT NOT NULL,
      role TEXT NOT NULL,
      id_token TEXT NOT NULL,
      created_at TEXT NOT NULL,
      expires_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
    "#,
  )?;
  record_version(&tx, 1, "Create sessions table")?;
  tx.commit()
}

/// v1→v2: Local identity provider and user records
fn migrate_v1_to_v2(conn: &Connection) -> Result<()> {
  tracing::info!("Running migration v1→v2: Create local identity tables");
  let tx = conn.unchecked_transaction()?;
  tx.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
      uid TEXT PRIMARY KEY,
      email TEXT NOT NULL UNIQUE COLLATE NOCASE,
      password_hash TEXT NOT NULL,
      created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS id_tokens (
      token_hash TEXT PRIMARY KEY,
      uid TEXT NOT NULL,
      expires_at TEXT NOT NULL,
      FOREIGN KEY (uid) REFERENCES accounts(uid) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS user_records (
      email TEXT PRIMARY KEY COLLATE NOCASE,
      role TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_id_tokens_expires_at ON id_tokens(expires_at);
    "#,
  )?;
  record_version(&tx, 2, "Create local identity tables (accounts, id_tokens, user_records)")?;
  tx.commit()
}

/// v2→v3: Property listings
fn migrate_v2_to_v3(conn: &Connection) -> Result<()> {
  tracing::info!("Running migration v2→v3: Create properties table");
  let tx = conn.unchecked_transaction()?;
  tx.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS properties (
      name TEXT PRIMARY KEY,
      location TEXT NOT NULL DEFAULT '',
      price TEXT NOT NULL DEFAULT '',
      description TEXT NOT NULL DEFAULT '',
      image TEXT
    );
    "#,
  )?;
  record_version(&tx, 3, "Create properties table")?;
  tx.commit()
}

/// Record a schema version after successful migration
fn record_version(conn: &Connection, version: i32, description: &str) -> Result<()> {
  let now = Utc::now().to_rfc3339();
  conn.execute(
    "INSERT INTO db_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
    params![version, now, description],
  )?;
  tracing::info!("Recorded schema version {} - {}", version, description);
  Ok(())
}

/// Get current schema version (0 if no versions recorded)
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
  conn.query_row(
    "SELECT COALESCE(MAX(version), 0) FROM db_version",
    [],
    |row| row.get(0),
  )
}
