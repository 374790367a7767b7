//! Application configuration
//!
//! Every setting has a default and may be overridden through a `FOLIO_*`
//! environment variable (`DATABASE_URL` for the database).

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default configuration values
pub struct Defaults;

impl Defaults {
    pub const HOST: &'static str = "127.0.0.1";
    pub const PORT: u16 = 8000;
    pub const PAGE_CACHE_TTL_SECS: u64 = 20;
    pub const POSTS_PER_PAGE: usize = 10;
    pub const MEDIA_ROOT: &'static str = "media";
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const MAX_REQUEST_SIZE: usize = 16 * 1024 * 1024;
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: '{value}', expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Validation failed for {field}: {reason}")]
    ValidationFailed { field: String, reason: String },
}

impl ConfigError {
    pub fn validation_failed(field: &str, reason: &str) -> Self {
        ConfigError::ValidationFailed {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidValue {
                field: "log_format".to_string(),
                value: other.to_string(),
                expected: "text, pretty or json".to_string(),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogFormat::Text => "text",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        };
        f.write_str(name)
    }
}

/// Settings for the whole service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// PostgreSQL connection string; the in-memory store is used when absent
    pub database_url: Option<String>,
    /// Lifetime of a cached index page
    pub page_cache_ttl_secs: u64,
    pub posts_per_page: usize,
    /// Directory uploaded images are written to and served from
    pub media_root: PathBuf,
    pub request_timeout_secs: u64,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: Defaults::HOST.to_string(),
            port: Defaults::PORT,
            database_url: None,
            page_cache_ttl_secs: Defaults::PAGE_CACHE_TTL_SECS,
            posts_per_page: Defaults::POSTS_PER_PAGE,
            media_root: PathBuf::from(Defaults::MEDIA_ROOT),
            request_timeout_secs: Defaults::REQUEST_TIMEOUT_SECS,
            max_request_size: Defaults::MAX_REQUEST_SIZE,
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            host: lookup("FOLIO_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "FOLIO_PORT", "port", "a port number")?
                .unwrap_or(defaults.port),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            page_cache_ttl_secs: parse_var(
                &lookup,
                "FOLIO_PAGE_CACHE_TTL",
                "page_cache_ttl_secs",
                "valid number of seconds",
            )?
            .unwrap_or(defaults.page_cache_ttl_secs),
            posts_per_page: parse_var(
                &lookup,
                "FOLIO_POSTS_PER_PAGE",
                "posts_per_page",
                "a positive number",
            )?
            .unwrap_or(defaults.posts_per_page),
            media_root: lookup("FOLIO_MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            request_timeout_secs: parse_var(
                &lookup,
                "FOLIO_REQUEST_TIMEOUT",
                "request_timeout_secs",
                "valid number of seconds",
            )?
            .unwrap_or(defaults.request_timeout_secs),
            max_request_size: parse_var(
                &lookup,
                "FOLIO_MAX_REQUEST_SIZE",
                "max_request_size",
                "valid number of bytes",
            )?
            .unwrap_or(defaults.max_request_size),
            log_format: match lookup("FOLIO_LOG_FORMAT") {
                Some(value) => value.parse()?,
                None => defaults.log_format,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::validation_failed(
                "request_timeout_secs",
                "Request timeout must be greater than 0",
            ));
        }

        if self.max_request_size == 0 {
            return Err(ConfigError::validation_failed(
                "max_request_size",
                "Maximum request size must be greater than 0",
            ));
        }

        if self.posts_per_page == 0 {
            return Err(ConfigError::validation_failed(
                "posts_per_page",
                "Posts per page must be greater than 0",
            ));
        }

        Ok(())
    }

    pub fn page_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.page_cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `host:port` the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(
    lookup: &F,
    key: &str,
    field: &str,
    expected: &str,
) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: field.to_string(),
                value: raw,
                expected: expected.to_string(),
            }),
    }
}
