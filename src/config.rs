use std::collections::HashSet;
use std::str::FromStr;

use thiserror::Error;

use crate::pipeline::assertion::DEFAULT_MAX_SENTENCE_LENGTH;
use crate::pipeline::model::DEFAULT_MODEL_NAME;

/// Application-level constants
pub const APP_NAME: &str = "Clinical Assertion API";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum sentences per batch request when none is configured.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,clinical_assertion=debug,tower_http=info"
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Runtime settings of the service, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub max_sentence_length: usize,
    pub max_batch_size: usize,
    /// Empty set disables authentication.
    pub api_keys: HashSet<String>,
    pub model_endpoint: String,
    pub model_name: String,
    pub model_timeout_secs: u64,
    pub mask_identifiers: bool,
    pub rate_limiting: bool,
    pub rate_limit_rpm: u32,
    pub cors_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            environment: "development".to_string(),
            max_sentence_length: DEFAULT_MAX_SENTENCE_LENGTH,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            api_keys: HashSet::new(),
            model_endpoint: "http://localhost:8080".to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_timeout_secs: 30,
            mask_identifiers: true,
            rate_limiting: false,
            rate_limit_rpm: 100,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServiceConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(get("PORT"), "PORT", defaults.port)?,
            environment: get("ENVIRONMENT").unwrap_or(defaults.environment),
            max_sentence_length: parse_or(
                get("MAX_SENTENCE_LENGTH"),
                "MAX_SENTENCE_LENGTH",
                defaults.max_sentence_length,
            )?,
            max_batch_size: parse_or(get("MAX_BATCH_SIZE"), "MAX_BATCH_SIZE", defaults.max_batch_size)?,
            api_keys: get("API_KEYS").map(|v| split_list(&v).collect()).unwrap_or_default(),
            model_endpoint: get("MODEL_ENDPOINT").unwrap_or(defaults.model_endpoint),
            model_name: get("MODEL_NAME").unwrap_or(defaults.model_name),
            model_timeout_secs: parse_or(
                get("MODEL_TIMEOUT_SECS"),
                "MODEL_TIMEOUT_SECS",
                defaults.model_timeout_secs,
            )?,
            mask_identifiers: parse_bool(get("MASK_IDENTIFIERS"), "MASK_IDENTIFIERS", defaults.mask_identifiers)?,
            rate_limiting: parse_bool(
                get("ENABLE_RATE_LIMITING"),
                "ENABLE_RATE_LIMITING",
                defaults.rate_limiting,
            )?,
            rate_limit_rpm: parse_or(get("RATE_LIMIT_RPM"), "RATE_LIMIT_RPM", defaults.rate_limit_rpm)?,
            cors_origins: get("CORS_ORIGINS")
                .map(|v| split_list(&v).collect())
                .unwrap_or(defaults.cors_origins),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn auth_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn parse_or<T: FromStr>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue { key, value: v }),
    }
}

fn parse_bool(value: Option<String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::InvalidValue {
            key,
            value: value.unwrap_or_default(),
        }),
    }
}
