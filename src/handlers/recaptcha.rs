use axum::{Json, extract::State, http::StatusCode, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecaptchaRequest {
  #[serde(rename = "g-recaptcha-response")]
  pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecaptchaResponse {
  pub success: bool,
  pub message: &'static str,
}

fn reply(status: StatusCode, success: bool, message: &'static str) -> (StatusCode, Json<RecaptchaResponse>) {
  (status, Json(RecaptchaResponse { success, message }))
}

/// POST /verify-recaptcha - Only routed when a verifier is configured
pub async fn verify_recaptcha(
  State(state): State<AppState>,
  payload: Result<Json<RecaptchaRequest>, JsonRejection>,
) -> (StatusCode, Json<RecaptchaResponse>) {
  let token = payload
    .ok()
    .and_then(|Json(body)| body.token)
    .filter(|t| !t.is_empty());
  let Some(token) = token else {
    return reply(StatusCode::BAD_REQUEST, false, "No reCAPTCHA token provided.");
  };

  let Some(verifier) = state.captcha.as_ref() else {
    tracing::error!("reCAPTCHA route hit without a configured verifier");
    return reply(StatusCode::INTERNAL_SERVER_ERROR, false, "Error verifying reCAPTCHA.");
  };

  match verifier.verify(&token).await {
    Ok(true) => reply(StatusCode::OK, true, "reCAPTCHA verified successfully."),
    Ok(false) => reply(StatusCode::BAD_REQUEST, false, "reCAPTCHA verification failed."),
    Err(e) => {
      tracing::error!("reCAPTCHA verification error: {}", e);
      reply(StatusCode::INTERNAL_SERVER_ERROR, false, "Error verifying reCAPTCHA.")
    }
  }
}
