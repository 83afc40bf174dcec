//! Credential validation applied before anything is forwarded to the
//! identity provider.
//!
//! Rules:
//! - Password: at least 9 UTF-16 code units on a single line, with at least one
//!   uppercase letter, one digit and one symbol (anything that is not an
//!   ASCII letter or digit, underscore included)
//! - Role: exactly `tenant` or `landlord`
//! - Required fields: present and non-empty

use crate::domain::Role;

/// Minimum password length in UTF-16 code units, as browser form checks count it
pub const MIN_PASSWORD_LEN: usize = 9;

pub const MISSING_REGISTER_FIELDS: &str = "Email, password, and role are required";
pub const MISSING_LOGIN_FIELDS: &str = "Email and password are required";
pub const INVALID_ROLE: &str = "Role must be either 'tenant' or 'landlord'";
pub const WEAK_PASSWORD: &str =
  "Password must be at least 9 characters and include an uppercase letter, a number, and a special character";

fn is_line_terminator(c: char) -> bool {
  matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Check password strength. Gives no feedback on which rule failed.
pub fn validate_password(password: &str) -> bool {
  let mut len = 0;
  let mut has_upper = false;
  let mut has_digit = false;
  let mut has_symbol = false;

  for c in password.chars() {
    if is_line_terminator(c) {
      return false;
    }
    len += c.len_utf16();
    has_upper |= c.is_ascii_uppercase();
    has_digit |= c.is_ascii_digit();
    has_symbol |= !c.is_ascii_alphanumeric();
  }

  len >= MIN_PASSWORD_LEN && has_upper && has_digit && has_symbol
}

/// Accept only the two role literals. Absent is rejected.
pub fn validate_role(role: Option<&str>) -> bool {
  role.and_then(Role::from_str).is_some()
}

/// A required field counts as present only when it is non-empty.
pub fn is_present(field: Option<&str>) -> bool {
  field.is_some_and(|s| !s.is_empty())
}
