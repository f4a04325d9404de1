use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::middleware_helpers::retry::RetryConfig;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_JWT_SECRET: &str =
    "bookstore_development_secret_key_that_is_long_enough_for_local_hs256_use";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key
    #[validate(custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// Access token lifetime in seconds (5min - 30d)
    #[validate(range(min = 300, max = 2_592_000))]
    pub jwt_expiration: usize,

    /// Issuer claim stamped on and required from access tokens
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// Audience claim stamped on and required from access tokens
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Attempts per database operation before a connection error is surfaced
    #[serde(default = "default_db_retry_attempts")]
    #[validate(range(min = 1, max = 10))]
    pub db_retry_attempts: u32,

    /// Fixed delay between database retries (milliseconds)
    #[serde(default = "default_db_retry_delay_ms")]
    pub db_retry_delay_ms: u64,

    /// Capacity of the domain event channel
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,
}

impl AppConfig {
    /// Creates a new configuration with defaults for every tunable
    pub fn new(
        database_url: String,
        jwt_secret: String,
        jwt_expiration: usize,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            db_retry_attempts: default_db_retry_attempts(),
            db_retry_delay_ms: default_db_retry_delay_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Retry policy handed to the database client
    pub fn db_retry(&self) -> RetryConfig {
        RetryConfig::fixed(
            self.db_retry_attempts,
            Duration::from_millis(self.db_retry_delay_ms),
        )
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET to a unique, secure value."
                    .into(),
            );
            errors.add("jwt_secret", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_db_retry_attempts() -> u32 {
    3
}

fn default_db_retry_delay_ms() -> u64 {
    1000
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_auth_issuer() -> String {
    "bookstore-api".to_string()
}

fn default_auth_audience() -> String {
    "bookstore-clients".to_string()
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => {
            let mut err = ValidationError::new("log_level");
            err.message = Some("log_level must be one of trace, debug, info, warn, error".into());
            Err(err)
        }
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 32 {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be at least 32 characters".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    let lower = trimmed.to_ascii_lowercase();
    let weak_fragments = ["changeme", "password", "12345"];
    if weak_fragments.iter().any(|pattern| lower.contains(pattern)) {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some(
            "JWT secret appears to be weak; use a cryptographically strong random string".into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Installs the global tracing subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("bookstore_api={},tower_http=info", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads configuration from `config/`, selecting the profile with `RUN_ENV`.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Layering: built-in defaults, `<dir>/default`, `<dir>/<run_env>`, then `APP__*` variables.
pub fn load_config_from(dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    let default_file = dir.join("default");
    let env_file = dir.join(run_env);

    let config = Config::builder()
        .set_default("database_url", "sqlite://bookstore.db?mode=rwc")?
        .set_default("jwt_expiration", 86_400)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&default_file.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_file.to_string_lossy()).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // jwt_secret has no default so production cannot silently run with a known key
    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_default(dir: &TempDir, content: &str) {
        fs::write(dir.path().join("default.toml"), content).unwrap();
    }

    #[test]
    fn loads_file_and_profile_overrides() {
        let dir = TempDir::new().unwrap();
        write_default(
            &dir,
            r#"
            database_url = "postgres://localhost/bookstore"
            jwt_secret = "a8f5f167f44f4964e6c998dee827110c_bookstore_tests"
            host = "127.0.0.1"
            db_retry_attempts = 5
            "#,
        );
        fs::write(dir.path().join("staging.toml"), "port = 9090\ncors_allow_any_origin = true\n")
            .unwrap();

        let config = load_config_from(dir.path(), "staging").unwrap();

        assert_eq!(config.database_url, "postgres://localhost/bookstore");
        assert_eq!(config.port, 9090);
        assert_eq!(config.environment, "staging");
        assert_eq!(config.db_retry_attempts, 5);
        assert_eq!(config.db_retry_delay_ms, 1000);
    }

    #[test]
    fn rejects_weak_jwt_secret() {
        let dir = TempDir::new().unwrap();
        write_default(&dir, r#"jwt_secret = "short""#);

        let result = load_config_from(dir.path(), "development");
        assert!(matches!(result, Err(AppConfigError::Validation(_))));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let dir = TempDir::new().unwrap();
        write_default(
            &dir,
            r#"
            jwt_secret = "a8f5f167f44f4964e6c998dee827110c_bookstore_tests"
            log_level = "loud"
            "#,
        );

        let result = load_config_from(dir.path(), "development");
        match result {
            Err(AppConfigError::Validation(errors)) => {
                assert!(errors.field_errors().contains_key("log_level"))
            }
            other => panic!("expected validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn missing_jwt_secret_is_reported() {
        let dir = TempDir::new().unwrap();
        let result = load_config_from(dir.path(), "development");
        assert!(matches!(result, Err(AppConfigError::Load(_))));
    }
}
