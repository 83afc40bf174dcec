//! Property listing lookup and landlord-only listing writes.

use axum::{
  Json,
  extract::{Query, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthContext, require_role};
use crate::domain::{Property, Role};
use crate::error::AppError;
use crate::state::AppState;

const NAME_REQUIRED: &str = "Property name is required";

#[derive(Debug, Deserialize)]
pub struct PropertyQuery {
  pub propertyname: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
  pub message: &'static str,
}

/// GET /property?propertyname=<name>
pub async fn get_property(
  State(state): State<AppState>,
  Query(query): Query<PropertyQuery>,
) -> Result<Json<Property>, AppError> {
  let name = query
    .propertyname
    .filter(|n| !n.trim().is_empty())
    .ok_or_else(|| AppError::bad_request(NAME_REQUIRED))?;

  state
    .records
    .get_property(&name)
    .await
    .map_err(|e| AppError::internal("Error retrieving property", e))?
    .map(Json)
    .ok_or_else(|| AppError::NotFound("Property not found".to_string()))
}

/// POST /property - Create or replace a listing (landlords only)
pub async fn save_property(
  State(state): State<AppState>,
  auth: AuthContext,
  payload: Result<Json<Property>, JsonRejection>,
) -> Result<Json<SavedResponse>, AppError> {
  require_role(Some(auth.role.as_str()), Role::Landlord)?;

  let property = match payload {
    Ok(Json(property)) => property,
    Err(rejection) => {
      tracing::debug!("Unreadable property body: {}", rejection);
      return Err(AppError::bad_request(NAME_REQUIRED));
    }
  };
  if property.name.trim().is_empty() {
    return Err(AppError::bad_request(NAME_REQUIRED));
  }

  state
    .records
    .put_property(&auth.id_token, &property)
    .await
    .map_err(|e| AppError::internal("Error saving property", e))?;

  tracing::info!("{} saved listing {}", auth.email, property.name);
  Ok(Json(SavedResponse {
    message: "Property saved",
  }))
}
