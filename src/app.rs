//! One configurable router for every deployment shape.
//!
//! The reCAPTCHA endpoint and the error envelope are driven by
//! [`Config`]; the backend adapter is picked from it too.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::auth;
use crate::backend::{FirebaseBackend, LocalBackend, ProviderError};
use crate::config::{BackendConfig, Config};
use crate::db::DbPool;
use crate::error;
use crate::handlers;
use crate::paths;
use crate::services::recaptcha::{CaptchaError, GoogleRecaptcha};
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to initialize backend: {0}")]
    Backend(#[from] ProviderError),
    #[error("failed to initialize reCAPTCHA client: {0}")]
    Captcha(#[from] CaptchaError),
}

/// Wire the configured backend and CAPTCHA verifier into application state.
pub fn build_state(config: &Config, db: DbPool) -> Result<AppState, StartupError> {
    let state = match &config.backend {
        BackendConfig::Local => {
            tracing::info!("Using local identity provider and record store");
            let local = Arc::new(LocalBackend::new(db.clone()));
            match local.cleanup_expired_tokens() {
                Ok(n) if n > 0 => tracing::info!("Removed {} expired identity tokens", n),
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to clean up expired identity tokens: {}", e),
            }
            AppState::new(db, local.clone(), local)
        }
        BackendConfig::Firebase(firebase) => {
            tracing::info!("Using Firebase backend at {}", firebase.database_url);
            let remote = Arc::new(FirebaseBackend::new(firebase.clone(), config.timeout_secs)?);
            AppState::new(db, remote.clone(), remote)
        }
    };

    let state = state
        .with_session(config.session.clone())
        .with_error_style(config.error_style);

    Ok(match &config.recaptcha {
        Some(recaptcha) => {
            tracing::info!("reCAPTCHA verification enabled");
            let verifier = GoogleRecaptcha::new(recaptcha.clone(), config.timeout_secs)?;
            state.with_captcha(Arc::new(verifier), recaptcha.site_key.clone())
        }
        None => state,
    })
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(auth::login_page))
        .route("/register", get(auth::register_page).post(auth::register_submit))
        .route("/resetPassword", get(auth::reset_password_page))
        .route("/login", post(auth::login_submit))
        .route("/logout", post(auth::logout))
        .route("/dashboard", get(handlers::dashboard))
        .route("/property", get(handlers::get_property).post(handlers::save_property))
        .route("/propertyPage", get(handlers::property_page))
        .route("/searchResults", get(handlers::search_results));

    if state.captcha.is_some() {
        app = app.route("/verify-recaptcha", post(handlers::verify_recaptcha));
    }

    app.nest_service("/static", ServeDir::new(paths::STATIC_DIR))
        .layer(middleware::from_fn_with_state(state.clone(), error::error_envelope))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router plus the CORS policy from configuration.
pub fn router_with_config(state: AppState, config: &Config) -> Router {
    let app = router(state);
    if config.cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}
