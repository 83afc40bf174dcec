//! Embedded identity provider and record store backed by app.db.
//!
//! Mirrors what the hosted service does for this application: argon2
//! password hashes stand in for the provider's account store, and issued
//! identity tokens are random ids stored as SHA-256 with an expiry.
//! Record writes and user reads require a valid token, like the hosted
//! database's auth rules.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use super::{Credential, IdentityProvider, ProviderError, RecordStore};
use crate::auth::password;
use crate::config;
use crate::db::{self, DbPool, LogOnError};
use crate::domain::{Property, UserRecord};
use crate::session::{expiry_after, generate_token, hash_token, timestamp};

/// Lifetime of an issued identity token
pub const TOKEN_TTL_HOURS: i64 = 1;

#[derive(Clone)]
pub struct LocalBackend {
    db: DbPool,
    token_ttl_hours: i64,
}

impl LocalBackend {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            token_ttl_hours: TOKEN_TTL_HOURS,
        }
    }

    pub fn with_token_ttl_hours(mut self, hours: i64) -> Self {
        self.token_ttl_hours = hours;
        self
    }

    /// Delete expired identity tokens, returning how many were removed
    pub fn cleanup_expired_tokens(&self) -> Result<usize, ProviderError> {
        let conn = db::try_lock(&self.db)?;
        Ok(cleanup_expired_tokens(&conn)?)
    }

    fn issue_token(&self, conn: &Connection, uid: &str) -> Result<String, ProviderError> {
        // Sweep occasionally, same odds as the session table
        if rand::random::<u8>() < config::SESSION_CLEANUP_THRESHOLD {
            cleanup_expired_tokens(conn).log_warn("Failed to clean up expired identity tokens");
        }

        let expires = expiry_after(Utc::now(), self.token_ttl_hours).ok_or_else(|| {
            ProviderError::Rejected(format!("token lifetime of {} hours is out of range", self.token_ttl_hours))
        })?;
        let token = generate_token();
        conn.execute(
            "INSERT INTO id_tokens (token_hash, uid, expires_at) VALUES (?1, ?2, ?3)",
            params![hash_token(&token), uid, timestamp(expires)],
        )?;
        Ok(token)
    }

    fn require_token(&self, conn: &Connection, id_token: &str) -> Result<String, ProviderError> {
        token_email(conn, id_token)?.ok_or(ProviderError::InvalidToken)
    }
}

fn cleanup_expired_tokens(conn: &Connection) -> rusqlite::Result<usize> {
    let now = timestamp(Utc::now());
    conn.execute("DELETE FROM id_tokens WHERE expires_at <= ?1", params![now])
}

fn token_email(conn: &Connection, id_token: &str) -> Result<Option<String>, ProviderError> {
    let now = timestamp(Utc::now());
    let email = conn
        .query_row(
            r#"
            SELECT a.email
            FROM id_tokens t
            JOIN accounts a ON t.uid = a.uid
            WHERE t.token_hash = ?1 AND t.expires_at > ?2
            "#,
            params![hash_token(id_token), now],
            |row| row.get(0),
        )
        .optional()?;
    Ok(email)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl IdentityProvider for LocalBackend {
    async fn create_account(&self, email: &str, password: &str) -> Result<Credential, ProviderError> {
        let password_hash =
            password::hash_password(password).map_err(|e| ProviderError::Hash(e.to_string()))?;
        let uid = generate_token();

        let conn = db::try_lock(&self.db)?;
        let now = timestamp(Utc::now());
        conn.execute(
            "INSERT INTO accounts (uid, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![uid, email, password_hash, now],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                ProviderError::EmailInUse
            } else {
                ProviderError::Storage(e)
            }
        })?;

        let id_token = self.issue_token(&conn, &uid)?;
        tracing::debug!("Created local account {}", uid);
        Ok(Credential {
            uid,
            email: email.to_string(),
            id_token,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Credential, ProviderError> {
        let account: Option<(String, String, String)> = {
            let conn = db::try_lock(&self.db)?;
            conn.query_row(
                "SELECT uid, email, password_hash FROM accounts WHERE email = ?1",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
        };
        let (uid, stored_email, password_hash) = account.ok_or(ProviderError::InvalidCredentials)?;

        // Argon2 verification runs without the lock held
        if !password::verify_password(password, &password_hash) {
            return Err(ProviderError::InvalidCredentials);
        }

        let conn = db::try_lock(&self.db)?;
        let id_token = self.issue_token(&conn, &uid)?;
        Ok(Credential {
            uid,
            email: stored_email,
            id_token,
        })
    }

    async fn verify_token(&self, id_token: &str) -> Result<String, ProviderError> {
        let conn = db::try_lock(&self.db)?;
        self.require_token(&conn, id_token)
    }
}

#[async_trait]
impl RecordStore for LocalBackend {
    async fn put_user(&self, id_token: &str, record: &UserRecord) -> Result<(), ProviderError> {
        let conn = db::try_lock(&self.db)?;
        self.require_token(&conn, id_token)?;
        conn.execute(
            "INSERT OR REPLACE INTO user_records (email, role) VALUES (?1, ?2)",
            params![record.email, record.role],
        )?;
        Ok(())
    }

    async fn get_user(&self, id_token: &str, email: &str) -> Result<Option<UserRecord>, ProviderError> {
        let conn = db::try_lock(&self.db)?;
        self.require_token(&conn, id_token)?;
        let record = conn
            .query_row(
                "SELECT email, role FROM user_records WHERE email = ?1",
                params![email],
                |row| {
                    Ok(UserRecord {
                        email: row.get(0)?,
                        role: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    async fn get_property(&self, name: &str) -> Result<Option<Property>, ProviderError> {
        let conn = db::try_lock(&self.db)?;
        let property = conn
            .query_row(
                "SELECT name, location, price, description, image FROM properties WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Property {
                        name: row.get(0)?,
                        location: row.get(1)?,
                        price: row.get(2)?,
                        description: row.get(3)?,
                        image: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(property)
    }

    async fn put_property(&self, id_token: &str, property: &Property) -> Result<(), ProviderError> {
        let conn = db::try_lock(&self.db)?;
        self.require_token(&conn, id_token)?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO properties (name, location, price, description, image)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                property.name,
                property.location,
                property.price,
                property.description,
                property.image
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    fn backend() -> LocalBackend {
        LocalBackend::new(db::init_memory_db().unwrap())
    }

    #[tokio::test]
    async fn test_create_then_sign_in() {
        let backend = backend();
        let created = backend.create_account("a@b.com", "Abcdefgh1!").await.unwrap();
        assert_eq!(created.email, "a@b.com");

        let signed_in = backend.sign_in("a@b.com", "Abcdefgh1!").await.unwrap();
        assert_eq!(signed_in.uid, created.uid);
        assert_ne!(signed_in.id_token, created.id_token);
        assert_eq!(backend.verify_token(&signed_in.id_token).await.unwrap(), "a@b.com");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_case_insensitively() {
        let backend = backend();
        backend.create_account("a@b.com", "Abcdefgh1!").await.unwrap();
        let err = backend.create_account("A@B.com", "Abcdefgh1!").await.unwrap_err();
        assert!(matches!(err, ProviderError::EmailInUse));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let backend = backend();
        backend.create_account("a@b.com", "Abcdefgh1!").await.unwrap();
        assert!(matches!(
            backend.sign_in("a@b.com", "wrong").await.unwrap_err(),
            ProviderError::InvalidCredentials
        ));
        assert!(matches!(
            backend.sign_in("nobody@b.com", "Abcdefgh1!").await.unwrap_err(),
            ProviderError::InvalidCredentials
        ));
    }

    #[tokio::test]
    async fn test_expired_and_bogus_tokens() {
        let backend = backend().with_token_ttl_hours(-1);
        let cred = backend.create_account("a@b.com", "Abcdefgh1!").await.unwrap();
        assert!(matches!(
            backend.verify_token(&cred.id_token).await.unwrap_err(),
            ProviderError::InvalidToken
        ));
        assert!(matches!(
            backend.verify_token("bogus").await.unwrap_err(),
            ProviderError::InvalidToken
        ));
    }

    fn token_rows(backend: &LocalBackend) -> i64 {
        let conn = backend.db.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM id_tokens", [], |r| r.get(0))
            .unwrap()
    }

    #[tokio::test]
    async fn test_expired_tokens_are_swept() {
        let backend = backend().with_token_ttl_hours(-1);
        backend.create_account("a@b.com", "Abcdefgh1!").await.unwrap();
        for _ in 0..20 {
            backend.sign_in("a@b.com", "Abcdefgh1!").await.unwrap();
        }
        assert!(token_rows(&backend) > 0);

        backend.cleanup_expired_tokens().unwrap();
        assert_eq!(token_rows(&backend), 0);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_live_tokens() {
        let backend = backend();
        let cred = backend.create_account("a@b.com", "Abcdefgh1!").await.unwrap();
        assert_eq!(backend.cleanup_expired_tokens().unwrap(), 0);
        assert_eq!(backend.verify_token(&cred.id_token).await.unwrap(), "a@b.com");
    }

    #[tokio::test]
    async fn test_out_of_range_token_lifetime_is_an_error() {
        let backend = backend().with_token_ttl_hours(i64::MAX);
        assert!(backend.create_account("a@b.com", "Abcdefgh1!").await.is_err());
    }

    #[tokio::test]
    async fn test_user_records_require_token() {
        let backend = backend();
        let cred = backend.create_account("l@b.com", "Abcdefgh1!").await.unwrap();
        let record = UserRecord::new("l@b.com", Role::Landlord);

        assert!(matches!(
            backend.put_user("bogus", &record).await.unwrap_err(),
            ProviderError::InvalidToken
        ));
        backend.put_user(&cred.id_token, &record).await.unwrap();
        assert_eq!(
            backend.get_user(&cred.id_token, "l@b.com").await.unwrap(),
            Some(record)
        );
        assert_eq!(backend.get_user(&cred.id_token, "x@b.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_properties() {
        let backend = backend();
        let cred = backend.create_account("l@b.com", "Abcdefgh1!").await.unwrap();
        let property = Property {
            name: "Loft".into(),
            location: "York".into(),
            price: "900".into(),
            description: "Bright".into(),
            image: None,
        };
        assert_eq!(backend.get_property("Loft").await.unwrap(), None);
        backend.put_property(&cred.id_token, &property).await.unwrap();
        assert_eq!(backend.get_property("Loft").await.unwrap(), Some(property));
    }
}
