//! Application configuration.
//!
//! Values are resolved with priority: environment (including `.env`) >
//! `config.toml` > built-in defaults. One `Config` drives the whole router,
//! so the reCAPTCHA endpoint and the error envelope are switches rather than
//! separate server builds.

use serde::Deserialize;
use std::path::Path;

// ==================== Defaults ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const SERVER_PORT: u16 = 3000;

/// Session expiration time in hours (matches the provider's identity token lifetime)
pub const SESSION_EXPIRY_HOURS: i64 = 1;

/// Longest accepted session lifetime (one leap year)
pub const MAX_SESSION_EXPIRY_HOURS: i64 = 24 * 366;

/// Probability threshold for session cleanup (0-255, lower = more frequent)
/// Value of 25 means ~10% chance (25/256) on each session lookup
pub const SESSION_CLEANUP_THRESHOLD: u8 = 25;

/// Firebase Auth REST base URL
pub const FIREBASE_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Google reCAPTCHA verification endpoint
pub const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Outbound request timeout for backend and CAPTCHA calls
pub const BACKEND_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("firebase backend requires {0}")]
    MissingFirebase(&'static str),
}

// ==================== Resolved configuration ====================

/// How error responses are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorStyle {
    /// `{"message": ...}` with a fixed message per route
    #[default]
    Inline,
    /// `{"error": ...}` produced by one response-mapping layer
    Centralized,
}

impl ErrorStyle {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "inline" => Some(Self::Inline),
            "centralized" => Some(Self::Centralized),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub database_url: String,
    pub identity_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Embedded SQLite identity provider and record store
    Local,
    Firebase(FirebaseConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecaptchaConfig {
    pub secret_key: String,
    /// Public key rendered into the register page widget
    pub site_key: Option<String>,
    pub verify_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub expiry_hours: i64,
    pub cookie_secure: bool,
    /// Re-verify the identity token and re-read the role on every gated request
    pub revalidate: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry_hours: SESSION_EXPIRY_HOURS,
            cookie_secure: false,
            revalidate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub addr: String,
    pub port: u16,
    pub cors_permissive: bool,
    pub session: SessionConfig,
    pub error_style: ErrorStyle,
    pub backend: BackendConfig,
    pub timeout_secs: u64,
    /// `None` leaves `/verify-recaptcha` unmounted
    pub recaptcha: Option<RecaptchaConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SERVER_ADDR.to_string(),
            port: SERVER_PORT,
            cors_permissive: true,
            session: SessionConfig::default(),
            error_style: ErrorStyle::default(),
            backend: BackendConfig::Local,
            timeout_secs: BACKEND_TIMEOUT_SECS,
            recaptcha: None,
        }
    }
}

impl Config {
    /// Get the full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

// ==================== config.toml structure ====================

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server: Option<ServerSection>,
    session: Option<SessionSection>,
    errors: Option<ErrorsSection>,
    backend: Option<BackendSection>,
    recaptcha: Option<RecaptchaSection>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    addr: Option<String>,
    port: Option<u16>,
    cors_permissive: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct SessionSection {
    expiry_hours: Option<i64>,
    cookie_secure: Option<bool>,
    revalidate: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ErrorsSection {
    style: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BackendSection {
    kind: Option<String>,
    timeout_secs: Option<u64>,
    firebase: Option<FirebaseSection>,
}

#[derive(Debug, Deserialize)]
struct FirebaseSection {
    api_key: Option<String>,
    database_url: Option<String>,
    identity_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecaptchaSection {
    secret_key: Option<String>,
    site_key: Option<String>,
    verify_url: Option<String>,
}

// ==================== Loading ====================

/// Load configuration from `.env`, `config.toml` and the process environment.
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let path = Path::new("config.toml");
    let file = match std::fs::read_to_string(path) {
        Ok(contents) => {
            tracing::info!("Using configuration from {}", path.display());
            toml::from_str::<FileConfig>(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        }
        Err(_) => FileConfig::default(),
    };

    resolve(file, |key| std::env::var(key).ok())
}

/// Load configuration from a TOML string, ignoring the process environment.
pub fn from_toml(contents: &str) -> Result<Config, ConfigError> {
    let file = toml::from_str::<FileConfig>(contents).map_err(|source| ConfigError::Parse {
        path: "<inline>".to_string(),
        source,
    })?;
    resolve(file, |_| None)
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn resolve(
    file: FileConfig,
    env: impl Fn(&'static str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    if let Some(server) = file.server {
        if let Some(addr) = server.addr {
            config.addr = addr;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(cors) = server.cors_permissive {
            config.cors_permissive = cors;
        }
    }
    if let Some(addr) = env("SERVER_ADDR") {
        config.addr = addr;
    }
    if let Some(port) = env("PORT") {
        config.port = port
            .parse()
            .map_err(|_| ConfigError::Invalid { key: "PORT", value: port })?;
    }

    if let Some(session) = file.session {
        if let Some(hours) = session.expiry_hours {
            config.session.expiry_hours = hours;
        }
        if let Some(secure) = session.cookie_secure {
            config.session.cookie_secure = secure;
        }
        if let Some(revalidate) = session.revalidate {
            config.session.revalidate = revalidate;
        }
    }
    if let Some(hours) = env("SESSION_EXPIRY_HOURS") {
        config.session.expiry_hours = hours.parse().map_err(|_| ConfigError::Invalid {
            key: "SESSION_EXPIRY_HOURS",
            value: hours,
        })?;
    }
    if let Some(secure) = env("COOKIE_SECURE") {
        config.session.cookie_secure = parse_bool("COOKIE_SECURE", secure)?;
    }
    if let Some(revalidate) = env("SESSION_REVALIDATE") {
        config.session.revalidate = parse_bool("SESSION_REVALIDATE", revalidate)?;
    }
    if !(1..=MAX_SESSION_EXPIRY_HOURS).contains(&config.session.expiry_hours) {
        return Err(ConfigError::Invalid {
            key: "session.expiry_hours",
            value: config.session.expiry_hours.to_string(),
        });
    }

    let style = env("ERROR_STYLE").or(file.errors.and_then(|e| e.style));
    if let Some(style) = style {
        config.error_style = ErrorStyle::from_str(&style).ok_or(ConfigError::Invalid {
            key: "errors.style",
            value: style,
        })?;
    }

    let backend = file.backend;
    let (kind, timeout, firebase) = match backend {
        Some(b) => (b.kind, b.timeout_secs, b.firebase),
        None => (None, None, None),
    };
    if let Some(timeout) = timeout {
        config.timeout_secs = timeout;
    }
    let kind = env("BACKEND").or(kind).unwrap_or_else(|| "local".to_string());
    config.backend = match kind.as_str() {
        "local" => BackendConfig::Local,
        "firebase" => {
            let (file_key, file_url, file_identity) = match firebase {
                Some(f) => (f.api_key, f.database_url, f.identity_url),
                None => (None, None, None),
            };
            let api_key = non_empty(env("GOOGLE_API_KEY").or(file_key))
                .ok_or(ConfigError::MissingFirebase("api_key"))?;
            let database_url = non_empty(env("FIREBASE_DATABASE_URL").or(file_url))
                .ok_or(ConfigError::MissingFirebase("database_url"))?;
            let identity_url = env("FIREBASE_IDENTITY_URL")
                .or(file_identity)
                .unwrap_or_else(|| FIREBASE_IDENTITY_URL.to_string());
            BackendConfig::Firebase(FirebaseConfig {
                api_key,
                database_url: database_url.trim_end_matches('/').to_string(),
                identity_url: identity_url.trim_end_matches('/').to_string(),
            })
        }
        _ => {
            return Err(ConfigError::Invalid {
                key: "backend.kind",
                value: kind,
            });
        }
    };

    let (file_secret, file_site, file_verify) = match file.recaptcha {
        Some(r) => (r.secret_key, r.site_key, r.verify_url),
        None => (None, None, None),
    };
    let site_key = non_empty(env("RECAPTCHA_SITE_KEY").or(file_site));
    config.recaptcha = non_empty(env("RECAPTCHA_SECRET_KEY").or(file_secret)).map(|secret_key| {
        RecaptchaConfig {
            secret_key,
            site_key,
            verify_url: file_verify.unwrap_or_else(|| RECAPTCHA_VERIFY_URL.to_string()),
        }
    });

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve_with(toml_src: &str, vars: &[(&'static str, &str)]) -> Result<Config, ConfigError> {
        let file: FileConfig = toml::from_str(toml_src).unwrap();
        let vars: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        resolve(file, |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert!(config.recaptcha.is_none());
        assert_eq!(config.error_style, ErrorStyle::Inline);
        assert!(config.session.revalidate);
    }

    #[test]
    fn test_file_values() {
        let config = from_toml(
            r#"
            [server]
            port = 8080
            [errors]
            style = "centralized"
            [session]
            revalidate = false
            [recaptcha]
            secret_key = "s3cret"
            site_key = "public"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.error_style, ErrorStyle::Centralized);
        assert!(!config.session.revalidate);
        let recaptcha = config.recaptcha.unwrap();
        assert_eq!(recaptcha.secret_key, "s3cret");
        assert_eq!(recaptcha.site_key.as_deref(), Some("public"));
        assert_eq!(recaptcha.verify_url, RECAPTCHA_VERIFY_URL);
    }

    #[test]
    fn test_env_overrides_file() {
        let config = resolve_with(
            "[server]\nport = 8080\n",
            &[("PORT", "9000"), ("ERROR_STYLE", "centralized")],
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.error_style, ErrorStyle::Centralized);
    }

    #[test]
    fn test_firebase_requires_key_and_url() {
        let err = resolve_with("", &[("BACKEND", "firebase")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFirebase("api_key")));

        let config = resolve_with(
            "",
            &[
                ("BACKEND", "firebase"),
                ("GOOGLE_API_KEY", "key"),
                ("FIREBASE_DATABASE_URL", "https://x.firebasedatabase.app/"),
            ],
        )
        .unwrap();
        match config.backend {
            BackendConfig::Firebase(f) => {
                assert_eq!(f.database_url, "https://x.firebasedatabase.app");
                assert_eq!(f.identity_url, FIREBASE_IDENTITY_URL);
            }
            BackendConfig::Local => panic!("expected firebase backend"),
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(resolve_with("", &[("ERROR_STYLE", "loud")]).is_err());
        assert!(resolve_with("", &[("BACKEND", "mongo")]).is_err());
        assert!(resolve_with("", &[("PORT", "http")]).is_err());
        assert!(resolve_with("", &[("COOKIE_SECURE", "maybe")]).is_err());
        assert!(resolve_with("[session]\nexpiry_hours = 0\n", &[]).is_err());
        assert!(resolve_with("[session]\nexpiry_hours = 10000000000\n", &[]).is_err());
        assert!(resolve_with("", &[("SESSION_EXPIRY_HOURS", "8785")]).is_err());
        assert!(resolve_with("", &[("SESSION_EXPIRY_HOURS", "8784")]).is_ok());
    }

    #[test]
    fn test_blank_recaptcha_secret_disables_route() {
        let config = resolve_with("", &[("RECAPTCHA_SECRET_KEY", "  ")]).unwrap();
        assert!(config.recaptcha.is_none());
    }
}
