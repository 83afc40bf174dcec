//! Server-side login sessions stored in app.db.
//!
//! The cookie carries an opaque random id; only its SHA-256 is stored.
//! A session row remembers the email, the role seen at login and the
//! identity token, so gated requests can re-verify with the provider.
//! Expired rows are swept lazily on lookup.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Result, params};
use sha2::{Digest, Sha256};

use crate::config;
use crate::db::LogOnError;

/// A live session row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  pub email: String,
  /// Role as stored at login
  pub role: String,
  pub id_token: String,
  pub expires_at: DateTime<Utc>,
}

/// Fixed-width UTC timestamp so stored values compare correctly as text
pub fn timestamp(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `now + hours`, or `None` when the result is out of range
pub fn expiry_after(now: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
  Duration::try_hours(hours).and_then(|d| now.checked_add_signed(d))
}

/// Generate a new opaque id (session ids, local identity tokens, account ids)
pub fn generate_token() -> String {
  use rand::Rng;
  let mut rng = rand::rng();
  (0..32)
    .map(|_| {
      let idx = rng.random_range(0..36);
      if idx < 10 {
        (b'0' + idx) as char
      } else {
        (b'a' + idx - 10) as char
      }
    })
    .collect()
}

/// SHA-256 hex digest of a token, used as its storage key
pub fn hash_token(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

/// Create a session and return the raw id to put in the cookie
pub fn create_session(
  conn: &Connection,
  email: &str,
  role: &str,
  id_token: &str,
  duration_hours: i64,
) -> Result<String> {
  let now = Utc::now();
  let expires = expiry_after(now, duration_hours).ok_or_else(|| {
    rusqlite::Error::ToSqlConversionFailure(
      format!("session lifetime of {} hours is out of range", duration_hours).into(),
    )
  })?;
  let session_id = generate_token();
  conn.execute(
    "INSERT INTO sessions (id_hash, email, role, id_token, created_at, expires_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![
      hash_token(&session_id),
      email,
      role,
      id_token,
      timestamp(now),
      timestamp(expires)
    ],
  )?;
  Ok(session_id)
}

/// Look up a live session by its cookie value
pub fn get_session(conn: &Connection, session_id: &str) -> Result<Option<Session>> {
  // Clean up expired sessions occasionally (~10% chance)
  if rand::random::<u8>() < config::SESSION_CLEANUP_THRESHOLD {
    cleanup_expired_sessions(conn).log_warn("Failed to clean up expired sessions");
  }

  let now = timestamp(Utc::now());
  let row = conn
    .query_row(
      "SELECT email, role, id_token, expires_at FROM sessions WHERE id_hash = ?1 AND expires_at > ?2",
      params![hash_token(session_id), now],
      |row| {
        Ok((
          row.get::<_, String>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, String>(2)?,
          row.get::<_, String>(3)?,
        ))
      },
    )
    .optional()?;

  Ok(row.and_then(|(email, role, id_token, expires_at)| {
    let expires_at = DateTime::parse_from_rfc3339(&expires_at)
      .log_warn("Unparseable session expiry")?
      .with_timezone(&Utc);
    Some(Session {
      email,
      role,
      id_token,
      expires_at,
    })
  }))
}

/// Delete a session (logout)
pub fn delete_session(conn: &Connection, session_id: &str) -> Result<()> {
  conn.execute(
    "DELETE FROM sessions WHERE id_hash = ?1",
    params![hash_token(session_id)],
  )?;
  Ok(())
}

/// Cleanup expired sessions, returns count of deleted sessions
pub fn cleanup_expired_sessions(conn: &Connection) -> Result<usize> {
  let now = timestamp(Utc::now());
  conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])
}
