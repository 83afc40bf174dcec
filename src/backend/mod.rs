//! Ports for the hosted identity provider and record store.
//!
//! The application never stores passwords or talks to a database of its own
//! for accounts: registration and login are forwarded to an
//! [`IdentityProvider`], and user/property records live in a [`RecordStore`].
//! Two adapters exist:
//! - [`firebase`]: Firebase Auth + Realtime Database over their REST APIs
//! - [`local`]: embedded SQLite with the same observable behavior

pub mod firebase;
pub mod local;

use async_trait::async_trait;

use crate::domain::{Property, UserRecord};

pub use firebase::FirebaseBackend;
pub use local::LocalBackend;

/// Result of a successful sign-up or sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Provider-assigned account id
    pub uid: String,
    pub email: String,
    /// Short-lived bearer token proving the sign-in; verified on gated requests
    pub id_token: String,
}

/// Failures surfaced by either port.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("email is already in use")]
    EmailInUse,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("identity token is invalid or expired")]
    InvalidToken,
    #[error("provider rejected the request: {0}")]
    Rejected(String),
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("storage unavailable")]
    Unavailable,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("unexpected provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<crate::db::DbLockError> for ProviderError {
    fn from(_: crate::db::DbLockError) -> Self {
        ProviderError::Unavailable
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account. Fails with [`ProviderError::EmailInUse`] for a taken email.
    async fn create_account(&self, email: &str, password: &str) -> Result<Credential, ProviderError>;

    /// Check credentials and issue a fresh identity token.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Credential, ProviderError>;

    /// Resolve an identity token back to the account email.
    async fn verify_token(&self, id_token: &str) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write `{email, role}` under the record's email key.
    async fn put_user(&self, id_token: &str, record: &UserRecord) -> Result<(), ProviderError>;

    async fn get_user(&self, id_token: &str, email: &str) -> Result<Option<UserRecord>, ProviderError>;

    async fn get_property(&self, name: &str) -> Result<Option<Property>, ProviderError>;

    async fn put_property(&self, id_token: &str, property: &Property) -> Result<(), ProviderError>;
}
