//! Firebase Auth and Realtime Database over their REST APIs.
//!
//! Identity: `accounts:signUp`, `accounts:signInWithPassword` and
//! `accounts:lookup` on the identity toolkit endpoint.
//! Records: `PUT`/`GET {database_url}/{path}.json?auth={idToken}`.
//!
//! Realtime Database keys may not contain `.`, `#`, `$`, `[` or `]`, so
//! emails and property names are passed through [`sanitize_key`] before
//! they become path segments.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use super::{Credential, IdentityProvider, ProviderError, RecordStore};
use crate::config::FirebaseConfig;
use crate::domain::{Property, UserRecord};

const USERS_PATH: &str = "users";
const PROPERTIES_PATH: &str = "properties";

/// Replace characters the Realtime Database forbids in keys with `_`.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '#' | '$' | '[' | ']' => '_',
            c => c,
        })
        .collect()
}

/// Map an identity toolkit error code onto the port's error taxonomy.
///
/// Codes arrive as e.g. `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should be ...`.
pub fn map_identity_error(message: &str) -> ProviderError {
    let code = message.split(" : ").next().unwrap_or(message).trim();
    match code {
        "EMAIL_EXISTS" => ProviderError::EmailInUse,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED"
        | "INVALID_EMAIL" => ProviderError::InvalidCredentials,
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" => ProviderError::InvalidToken,
        other => ProviderError::Rejected(other.to_string()),
    }
}

#[derive(Deserialize)]
struct IdentityErrorBody {
    error: IdentityErrorDetail,
}

#[derive(Deserialize)]
struct IdentityErrorDetail {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    id_token: String,
    email: String,
    local_id: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
struct LookupUser {
    email: Option<String>,
}

#[derive(Clone)]
pub struct FirebaseBackend {
    client: Client,
    config: FirebaseConfig,
}

impl FirebaseBackend {
    pub fn new(config: FirebaseConfig, timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn identity_url(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}?key={}",
            self.config.identity_url,
            method,
            urlencoding::encode(&self.config.api_key)
        )
    }

    fn record_url(&self, collection: &str, key: &str, id_token: Option<&str>) -> String {
        let mut url = format!(
            "{}/{}/{}.json",
            self.config.database_url,
            collection,
            urlencoding::encode(&sanitize_key(key))
        );
        if let Some(token) = id_token {
            url.push_str("?auth=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    async fn identity_call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .post(self.identity_url(method))
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response.json::<T>().await?);
        }

        let status = response.status();
        let text = response.text().await?;
        match serde_json::from_str::<IdentityErrorBody>(&text) {
            Ok(body) => {
                tracing::debug!("accounts:{} rejected: {}", method, body.error.message);
                Err(map_identity_error(&body.error.message))
            }
            Err(_) => Err(ProviderError::Rejected(format!("HTTP {}", status))),
        }
    }

    async fn read_record<T: DeserializeOwned>(response: Response) -> Result<Option<T>, ProviderError> {
        let response = Self::check_record_status(response).await?;
        // A missing path comes back as a literal `null`
        let value = response.json::<Option<T>>().await?;
        Ok(value)
    }

    async fn check_record_status(response: Response) -> Result<Response, ProviderError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| format!("HTTP {}", status));
        Err(ProviderError::Rejected(message))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseBackend {
    async fn create_account(&self, email: &str, password: &str) -> Result<Credential, ProviderError> {
        let auth: AuthResponse = self
            .identity_call(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(Credential {
            uid: auth.local_id,
            email: auth.email,
            id_token: auth.id_token,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Credential, ProviderError> {
        let auth: AuthResponse = self
            .identity_call(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(Credential {
            uid: auth.local_id,
            email: auth.email,
            id_token: auth.id_token,
        })
    }

    async fn verify_token(&self, id_token: &str) -> Result<String, ProviderError> {
        let lookup: LookupResponse = self
            .identity_call("lookup", json!({ "idToken": id_token }))
            .await?;
        lookup
            .users
            .into_iter()
            .next()
            .and_then(|u| u.email)
            .ok_or(ProviderError::InvalidToken)
    }
}

#[async_trait]
impl RecordStore for FirebaseBackend {
    async fn put_user(&self, id_token: &str, record: &UserRecord) -> Result<(), ProviderError> {
        let response = self
            .client
            .put(self.record_url(USERS_PATH, &record.email, Some(id_token)))
            .json(record)
            .send()
            .await?;
        Self::check_record_status(response).await?;
        Ok(())
    }

    async fn get_user(&self, id_token: &str, email: &str) -> Result<Option<UserRecord>, ProviderError> {
        let response = self
            .client
            .get(self.record_url(USERS_PATH, email, Some(id_token)))
            .send()
            .await?;
        Self::read_record(response).await
    }

    async fn get_property(&self, name: &str) -> Result<Option<Property>, ProviderError> {
        let response = self
            .client
            .get(self.record_url(PROPERTIES_PATH, name, None))
            .send()
            .await?;
        Self::read_record(response).await
    }

    async fn put_property(&self, id_token: &str, property: &Property) -> Result<(), ProviderError> {
        let response = self
            .client
            .put(self.record_url(PROPERTIES_PATH, &property.name, Some(id_token)))
            .json(property)
            .send()
            .await?;
        Self::check_record_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> FirebaseBackend {
        FirebaseBackend::new(
            FirebaseConfig {
                api_key: "key".into(),
                database_url: "https://demo.firebasedatabase.app".into(),
                identity_url: "https://identitytoolkit.googleapis.com/v1".into(),
            },
            5,
        )
        .unwrap()
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("jane.doe@mail.co.uk"), "jane_doe@mail_co_uk");
        assert_eq!(sanitize_key("a#b$c[d]e"), "a_b_c_d_e");
        assert_eq!(sanitize_key("plain"), "plain");
    }

    #[test]
    fn test_map_identity_error() {
        assert!(matches!(map_identity_error("EMAIL_EXISTS"), ProviderError::EmailInUse));
        assert!(matches!(
            map_identity_error("INVALID_LOGIN_CREDENTIALS"),
            ProviderError::InvalidCredentials
        ));
        assert!(matches!(map_identity_error("TOKEN_EXPIRED"), ProviderError::InvalidToken));
        match map_identity_error("WEAK_PASSWORD : Password should be at least 6 characters") {
            ProviderError::Rejected(code) => assert_eq!(code, "WEAK_PASSWORD"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_urls() {
        let backend = backend();
        assert_eq!(
            backend.identity_url("signUp"),
            "https://identitytoolkit.googleapis.com/v1/accounts:signUp?key=key"
        );
        assert_eq!(
            backend.record_url(USERS_PATH, "jane.doe@mail.com", Some("t/k")),
            "https://demo.firebasedatabase.app/users/jane_doe%40mail_com.json?auth=t%2Fk"
        );
        assert_eq!(
            backend.record_url(PROPERTIES_PATH, "Sea View", None),
            "https://demo.firebasedatabase.app/properties/Sea%20View.json"
        );
    }

    #[test]
    fn test_auth_response_shape() {
        let auth: AuthResponse = serde_json::from_str(
            r#"{"kind":"identitytoolkit#SignupNewUserResponse","idToken":"tok","email":"a@b.com","refreshToken":"r","expiresIn":"3600","localId":"uid1"}"#,
        )
        .unwrap();
        assert_eq!(auth.local_id, "uid1");
        assert_eq!(auth.id_token, "tok");
    }
}
