//! Role-based access gate.

use crate::domain::Role;
use crate::error::AppError;

pub const ACCESS_DENIED: &str = "Access denied";

/// The two role-specific dashboard views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dashboard {
    Tenant,
    Landlord,
}

/// Map a session role to its dashboard. Unset or unknown roles get nothing.
pub fn dashboard_for(role: Option<&str>) -> Option<Dashboard> {
    match role.and_then(Role::from_str)? {
        Role::Tenant => Some(Dashboard::Tenant),
        Role::Landlord => Some(Dashboard::Landlord),
    }
}

/// Deny unless the session role is exactly `required`.
pub fn require_role(role: Option<&str>, required: Role) -> Result<(), AppError> {
    match role.and_then(Role::from_str) {
        Some(r) if r == required => Ok(()),
        _ => Err(AppError::Forbidden(ACCESS_DENIED.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_for() {
        assert_eq!(dashboard_for(Some("tenant")), Some(Dashboard::Tenant));
        assert_eq!(dashboard_for(Some("landlord")), Some(Dashboard::Landlord));
        assert_eq!(dashboard_for(Some("admin")), None);
        assert_eq!(dashboard_for(Some("")), None);
        assert_eq!(dashboard_for(None), None);
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(Some("landlord"), Role::Landlord).is_ok());
        assert!(matches!(
            require_role(Some("tenant"), Role::Landlord),
            Err(AppError::Forbidden(_))
        ));
        assert!(require_role(None, Role::Tenant).is_err());
    }
}
