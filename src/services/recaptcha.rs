//! reCAPTCHA token verification.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::RecaptchaConfig;

#[derive(Debug, thiserror::Error)]
pub enum CaptchaError {
    #[error("verification request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("verification endpoint answered HTTP {0}")]
    Status(u16),
}

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// `Ok(true)` when the provider accepts the token.
    async fn verify(&self, token: &str) -> Result<bool, CaptchaError>;
}

#[derive(Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Google `siteverify` client
pub struct GoogleRecaptcha {
    client: Client,
    config: RecaptchaConfig,
}

impl GoogleRecaptcha {
    pub fn new(config: RecaptchaConfig, timeout_secs: u64) -> Result<Self, CaptchaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl CaptchaVerifier for GoogleRecaptcha {
    async fn verify(&self, token: &str) -> Result<bool, CaptchaError> {
        let response = self
            .client
            .post(&self.config.verify_url)
            .form(&[("secret", self.config.secret_key.as_str()), ("response", token)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CaptchaError::Status(response.status().as_u16()));
        }
        let reply: SiteVerifyResponse = response.json().await?;

        if !reply.success {
            tracing::debug!("reCAPTCHA rejected token: {:?}", reply.error_codes);
        }
        Ok(reply.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_siteverify_reply_shape() {
        let ok: SiteVerifyResponse =
            serde_json::from_str(r#"{"success":true,"challenge_ts":"2024-01-01T00:00:00Z","hostname":"x"}"#)
                .unwrap();
        assert!(ok.success);
        assert!(ok.error_codes.is_empty());

        let failed: SiteVerifyResponse =
            serde_json::from_str(r#"{"success":false,"error-codes":["invalid-input-response"]}"#).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.error_codes, vec!["invalid-input-response"]);
    }
}
