//! Authentication handlers for login, register, and logout.
//!
//! Credentials are validated here and then forwarded to the identity
//! provider; the user's role lives in the record store keyed by email.

use askama::Template;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{Html, IntoResponse},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use super::middleware::SESSION_COOKIE_NAME;
use crate::backend::ProviderError;
use crate::db;
use crate::domain::{Role, UserRecord};
use crate::error::AppError;
use crate::filters;
use crate::session;
use crate::state::AppState;
use crate::validation::{self, INVALID_ROLE, MISSING_LOGIN_FIELDS, MISSING_REGISTER_FIELDS, WEAK_PASSWORD};

const EMAIL_IN_USE: &str = "Email is already in use";
const REGISTRATION_FAILED: &str = "Error during registration";
const LOGIN_FAILED: &str = "Incorrect email or password";
const USER_NOT_FOUND: &str = "User not found";

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub version: &'static str,
}

#[derive(Template)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub recaptcha_site_key: Option<String>,
}

#[derive(Template)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {}

/// Registration body. Fields are optional so absence maps to 400, not a parse error.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub role: String,
}

/// A malformed or non-JSON body is treated like an empty one.
fn body_or_default<T: Default>(payload: Result<Json<T>, JsonRejection>) -> T {
    match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!("Ignoring unreadable request body: {}", rejection);
            T::default()
        }
    }
}

/// GET / - Show login page
pub async fn login_page() -> Html<String> {
    let template = LoginTemplate {
        version: env!("CARGO_PKG_VERSION"),
    };
    Html(template.render().unwrap_or_default())
}

/// GET /register - Show registration page
pub async fn register_page(State(state): State<AppState>) -> Html<String> {
    let template = RegisterTemplate {
        recaptcha_site_key: state.captcha_site_key.clone(),
    };
    Html(template.render().unwrap_or_default())
}

/// GET /resetPassword - Show password reset page
pub async fn reset_password_page() -> Html<String> {
    Html(ResetPasswordTemplate {}.render().unwrap_or_default())
}

/// POST /register - Create an account and store its role
pub async fn register_submit(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let RegisterRequest { email, password, role } = body_or_default(payload);

    if ![email.as_deref(), password.as_deref(), role.as_deref()]
        .into_iter()
        .all(validation::is_present)
    {
        return Err(AppError::bad_request(MISSING_REGISTER_FIELDS));
    }
    let (Some(email), Some(password), Some(role)) = (email, password, role) else {
        return Err(AppError::bad_request(MISSING_REGISTER_FIELDS));
    };

    if !validation::validate_role(Some(role.as_str())) {
        return Err(AppError::bad_request(INVALID_ROLE));
    }
    let Some(role) = Role::from_str(&role) else {
        return Err(AppError::bad_request(INVALID_ROLE));
    };
    if !validation::validate_password(&password) {
        return Err(AppError::bad_request(WEAK_PASSWORD));
    }

    let credential = match state.identity.create_account(&email, &password).await {
        Ok(credential) => credential,
        Err(ProviderError::EmailInUse) => return Err(AppError::Conflict(EMAIL_IN_USE.to_string())),
        Err(e) => return Err(AppError::internal(REGISTRATION_FAILED, e)),
    };

    let record = UserRecord::new(&email, role);
    state
        .records
        .put_user(&credential.id_token, &record)
        .await
        .map_err(|e| AppError::internal(REGISTRATION_FAILED, e))?;

    tracing::info!("Registered {} as {}", email, role);
    Ok(Json(MessageResponse {
        message: "User registered successfully",
    }))
}

/// POST /login - Sign in, start a session and report the role
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let LoginRequest { email, password } = body_or_default(payload);

    let (Some(email), Some(password)) = (email, password) else {
        return Err(AppError::bad_request(MISSING_LOGIN_FIELDS));
    };
    if !validation::is_present(Some(email.as_str())) || !validation::is_present(Some(password.as_str())) {
        return Err(AppError::bad_request(MISSING_LOGIN_FIELDS));
    }

    let credential = state.identity.sign_in(&email, &password).await.map_err(|e| {
        tracing::warn!("Login failed for {}: {}", email, e);
        AppError::Unauthorized(LOGIN_FAILED.to_string())
    })?;

    let record = state
        .records
        .get_user(&credential.id_token, &email)
        .await
        .map_err(|e| {
            tracing::warn!("Role lookup failed for {}: {}", email, e);
            AppError::Unauthorized(LOGIN_FAILED.to_string())
        })?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    let session_id = {
        let conn = db::try_lock(&state.db)
            .map_err(|e| AppError::internal("Failed to create session", e.into()))?;
        session::create_session(
            &conn,
            &email,
            &record.role,
            &credential.id_token,
            state.session.expiry_hours,
        )
        .map_err(|e| AppError::internal("Failed to create session", e.into()))?
    };

    let session_cookie = Cookie::build((SESSION_COOKIE_NAME, session_id))
        .path("/")
        .http_only(true)
        .secure(state.session.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(state.session.expiry_hours))
        .build();

    tracing::info!("{} logged in as {}", email, record.role);
    Ok((
        jar.add(session_cookie),
        Json(LoginResponse {
            message: "Login successful",
            role: record.role,
        }),
    ))
}

/// POST /logout - Drop the session and clear the cookie
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE_NAME) {
        let session_id = session_cookie.value();
        if let Ok(conn) = db::try_lock(&state.db) {
            if let Err(e) = session::delete_session(&conn, session_id) {
                tracing::warn!("Failed to delete session during logout: {}", e);
            }
        }
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE_NAME).path("/"));
    (jar, Json(MessageResponse { message: "Logged out" }))
}
