//! Registration, login and the role-gated session context.

pub mod gate;
pub mod handlers;
pub mod middleware;
pub mod password;

pub use gate::{Dashboard, dashboard_for, require_role};
pub use handlers::*;
pub use middleware::{AuthContext, SESSION_COOKIE_NAME};
