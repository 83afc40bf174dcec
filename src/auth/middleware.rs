//! Session extractor for gated routes.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;

use super::gate::ACCESS_DENIED;
use crate::backend::ProviderError;
use crate::db;
use crate::error::AppError;
use crate::session;
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "easyrent_session";

/// Authenticated request context.
/// Add this as a handler parameter to require a live session; requests
/// without one are rejected with 403.
///
/// With revalidation on, the session's identity token is verified with the
/// provider and the role is re-read from the record store on every request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub email: String,
    /// Role as stored; may be a value the gate does not recognise
    pub role: String,
    pub id_token: String,
}

fn denied() -> AppError {
    AppError::Forbidden(ACCESS_DENIED.to_string())
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| denied())?;

        let session_id = jar
            .get(SESSION_COOKIE_NAME)
            .map(|c| c.value().to_string())
            .ok_or_else(denied)?;

        // Guard must be released before any provider call is awaited
        let session = {
            let conn = db::try_lock(&state.db)
                .map_err(|e| AppError::internal("Error verifying session", e.into()))?;
            session::get_session(&conn, &session_id)
                .map_err(|e| AppError::internal("Error verifying session", e.into()))?
        }
        .ok_or_else(denied)?;

        if !state.session.revalidate {
            return Ok(AuthContext {
                email: session.email,
                role: session.role,
                id_token: session.id_token,
            });
        }

        let email = match state.identity.verify_token(&session.id_token).await {
            Ok(email) => email,
            Err(ProviderError::InvalidToken) => {
                tracing::debug!("Identity token for {} no longer valid", session.email);
                return Err(denied());
            }
            Err(e) => return Err(AppError::internal("Error verifying session", e)),
        };
        if !email.eq_ignore_ascii_case(&session.email) {
            tracing::warn!("Session email {} does not match token email {}", session.email, email);
            return Err(denied());
        }

        let record = state
            .records
            .get_user(&session.id_token, &session.email)
            .await
            .map_err(|e| match e {
                ProviderError::InvalidToken => denied(),
                e => AppError::internal("Error verifying session", e),
            })?
            .ok_or_else(denied)?;

        Ok(AuthContext {
            email: session.email,
            role: record.role,
            id_token: session.id_token,
        })
    }
}
