use askama::Template;
use axum::response::Html;

use crate::auth::{AuthContext, Dashboard, dashboard_for, gate::ACCESS_DENIED};
use crate::error::AppError;
use crate::filters;

#[derive(Template)]
#[template(path = "tenant_dashboard.html")]
pub struct TenantDashboardTemplate {
  pub email: String,
}

#[derive(Template)]
#[template(path = "landlord_dashboard.html")]
pub struct LandlordDashboardTemplate {
  pub email: String,
}

/// GET /dashboard - Serve the dashboard for the session's role
pub async fn dashboard(auth: AuthContext) -> Result<Html<String>, AppError> {
  let html = match dashboard_for(Some(auth.role.as_str())) {
    Some(Dashboard::Tenant) => TenantDashboardTemplate { email: auth.email }.render(),
    Some(Dashboard::Landlord) => LandlordDashboardTemplate { email: auth.email }.render(),
    None => {
      tracing::warn!("Denied dashboard for {} with role {:?}", auth.email, auth.role);
      return Err(AppError::Forbidden(ACCESS_DENIED.to_string()));
    }
  };
  Ok(Html(html.unwrap_or_default()))
}
