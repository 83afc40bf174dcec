//! Application state shared by all handlers.

use std::sync::Arc;

use crate::backend::{IdentityProvider, RecordStore};
use crate::config::{ErrorStyle, SessionConfig};
use crate::db::DbPool;
use crate::services::recaptcha::CaptchaVerifier;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// app.db (sessions; also the local backend's tables)
    pub db: DbPool,

    pub identity: Arc<dyn IdentityProvider>,

    pub records: Arc<dyn RecordStore>,

    /// `None` when reCAPTCHA is not configured
    pub captcha: Option<Arc<dyn CaptchaVerifier>>,

    /// Public reCAPTCHA key for the register page widget
    pub captcha_site_key: Option<String>,

    pub session: SessionConfig,

    pub error_style: ErrorStyle,
}

impl AppState {
    pub fn new(
        db: DbPool,
        identity: Arc<dyn IdentityProvider>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            db,
            identity,
            records,
            captcha: None,
            captcha_site_key: None,
            session: SessionConfig::default(),
            error_style: ErrorStyle::default(),
        }
    }

    pub fn with_captcha(mut self, captcha: Arc<dyn CaptchaVerifier>, site_key: Option<String>) -> Self {
        self.captcha = Some(captcha);
        self.captcha_site_key = site_key;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_error_style(mut self, style: ErrorStyle) -> Self {
        self.error_style = style;
        self
    }
}
