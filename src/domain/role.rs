use serde::{Deserialize, Serialize};

/// Account category chosen at registration. Controls which dashboard is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Tenant,
  Landlord,
}

impl Role {
  /// Exact, case-sensitive match on the two stored literals.
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "tenant" => Some(Self::Tenant),
      "landlord" => Some(Self::Landlord),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Tenant => "tenant",
      Self::Landlord => "landlord",
    }
  }
}

impl std::fmt::Display for Role {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Stored user record: the email it is keyed by and the role picked at signup.
///
/// `role` is kept as the raw stored string so a record written by another
/// client with an unexpected value is still readable (and then denied by the
/// dashboard gate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
  pub email: String,
  pub role: String,
}

impl UserRecord {
  pub fn new(email: &str, role: Role) -> Self {
    Self {
      email: email.to_string(),
      role: role.as_str().to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_role_literals() {
    assert_eq!(Role::from_str("tenant"), Some(Role::Tenant));
    assert_eq!(Role::from_str("landlord"), Some(Role::Landlord));
    assert_eq!(Role::from_str("Tenant"), None);
    assert_eq!(Role::from_str("admin"), None);
    assert_eq!(Role::Landlord.to_string(), "landlord");
  }

  #[test]
  fn test_user_record_serializes_lowercase_role() {
    let record = UserRecord::new("a@b.com", Role::Tenant);
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json, serde_json::json!({"email": "a@b.com", "role": "tenant"}));
  }
}
