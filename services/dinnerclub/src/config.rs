//! Service configuration
//!
//! Loaded once at startup from, in increasing priority: serde defaults, an
//! optional TOML file and `DINNERCLUB_*` environment variables. Nested keys
//! use `__` in variable names, e.g. `DINNERCLUB_JWT__ACCESS_TOKEN_SECRET`.

use common::database::DatabaseConfig;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use crate::jwt::JwtConfig;
use crate::password::PasswordConfig;
use crate::session::MIN_SECRET_LEN;

/// Config file read when `DINNERCLUB_CONFIG` is not set
pub const DEFAULT_CONFIG_FILE: &str = "dinnerclub.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_VAR: &str = "DINNERCLUB_CONFIG";

/// Longest accepted session or token lifetime, ten years in seconds
pub const MAX_LIFETIME_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Service configuration
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub city_code: String,
    #[serde(default)]
    pub referral_code: Option<String>,
    pub session_secret: String,
    #[serde(default = "default_session_ttl_seconds")]
    pub session_ttl_seconds: u64,
    #[serde(default)]
    pub secure_cookies: bool,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_ttl_seconds() -> u64 {
    86400
}

impl AppConfig {
    /// Load configuration from the config file and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var(CONFIG_PATH_VAR).ok();
        let path = explicit
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        Self::from_builder(
            Config::builder()
                .add_source(File::new(&path, FileFormat::Toml).required(explicit.is_some())),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix("DINNERCLUB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the service cannot safely run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.city_code.trim().is_empty() {
            return Err(ConfigError::Invalid("city_code must not be empty".into()));
        }

        if self.session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "session_secret must be at least {} bytes long",
                MIN_SECRET_LEN
            )));
        }

        if self.jwt.access_token_secret.is_empty() || self.jwt.refresh_token_secret.is_empty() {
            return Err(ConfigError::Invalid("JWT secrets must not be empty".into()));
        }

        if self.jwt.access_token_secret == self.jwt.refresh_token_secret {
            return Err(ConfigError::Invalid(
                "access and refresh token secrets must differ".into(),
            ));
        }

        let lifetimes = [
            ("session_ttl_seconds", self.session_ttl_seconds),
            ("jwt.access_token_expiry", self.jwt.access_token_expiry),
            ("jwt.refresh_token_expiry", self.jwt.refresh_token_expiry),
        ];
        for (key, seconds) in lifetimes {
            if seconds == 0 || seconds > MAX_LIFETIME_SECONDS {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 1 and {} seconds",
                    key, MAX_LIFETIME_SECONDS
                )));
            }
        }

        Ok(())
    }

    /// City code as shown on every page
    pub fn normalized_city_code(&self) -> String {
        self.city_code.trim().to_uppercase()
    }

    /// Referral code required at registration, if the gate is enabled
    pub fn referral_gate(&self) -> Option<String> {
        self.referral_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("listen_addr", &self.listen_addr)
            .field("log_level", &self.log_level)
            .field("city_code", &self.city_code)
            .field("referral_gate", &self.referral_gate().is_some())
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("secure_cookies", &self.secure_cookies)
            .field("password", &self.password)
            .field("database", &self.database.url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const MINIMAL: &str = r#"
        city_code = "pdx"
        session_secret = "0123456789abcdef0123456789abcdef"

        [jwt]
        access_token_secret = "access"
        refresh_token_secret = "refresh"
    "#;

    fn from_toml(toml: &str) -> Result<AppConfig, ConfigError> {
        AppConfig::from_builder(
            Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
    }

    #[test]
    #[serial]
    fn test_defaults() {
        let config = from_toml(MINIMAL).unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.session_ttl_seconds, 86400);
        assert_eq!(config.jwt.access_token_expiry, 900);
        assert_eq!(config.jwt.refresh_token_expiry, 604800);
        assert_eq!(config.database.url, "sqlite://dinnerclub.db");
        assert_eq!(config.normalized_city_code(), "PDX");
        assert_eq!(config.referral_gate(), None);
    }

    #[test]
    #[serial]
    fn test_missing_required_key() {
        let result = from_toml(
            r#"
            city_code = "pdx"
            [jwt]
            access_token_secret = "access"
            refresh_token_secret = "refresh"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    #[serial]
    fn test_short_session_secret_rejected() {
        let toml = MINIMAL.replace("0123456789abcdef0123456789abcdef", "short");
        assert!(matches!(from_toml(&toml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    #[serial]
    fn test_equal_token_secrets_rejected() {
        let toml = MINIMAL.replace("\"refresh\"", "\"access\"");
        assert!(matches!(from_toml(&toml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    #[serial]
    fn test_lifetimes_are_bounded() {
        let huge = format!("session_ttl_seconds = {}\n{}", i64::MAX, MINIMAL);
        assert!(matches!(from_toml(&huge), Err(ConfigError::Invalid(_))));

        let huge = MINIMAL.replace(
            "[jwt]",
            &format!("[jwt]\naccess_token_expiry = {}", i64::MAX),
        );
        assert!(matches!(from_toml(&huge), Err(ConfigError::Invalid(_))));

        let zero = format!("session_ttl_seconds = 0\n{}", MINIMAL);
        assert!(matches!(from_toml(&zero), Err(ConfigError::Invalid(_))));
    }

    #[test]
    #[serial]
    fn test_blank_referral_code_disables_gate() {
        let toml = format!("referral_code = \"  \"\n{}", MINIMAL);
        assert_eq!(from_toml(&toml).unwrap().referral_gate(), None);
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        // SAFETY: serialized with every other test that reads the environment
        unsafe {
            std::env::set_var("DINNERCLUB_REFERRAL_CODE", "supper");
            std::env::set_var("DINNERCLUB_JWT__ACCESS_TOKEN_EXPIRY", "60");
        }

        let config = from_toml(MINIMAL);

        unsafe {
            std::env::remove_var("DINNERCLUB_REFERRAL_CODE");
            std::env::remove_var("DINNERCLUB_JWT__ACCESS_TOKEN_EXPIRY");
        }

        let config = config.unwrap();
        assert_eq!(config.referral_gate().as_deref(), Some("supper"));
        assert_eq!(config.jwt.access_token_expiry, 60);
    }
}
