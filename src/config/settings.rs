use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::utils::constants::{
    DEFAULT_BANNED_CODE, DEFAULT_FORBIDDEN_LOCATION, DEFAULT_HTTP_TIMEOUT_MS,
    DEFAULT_LOGIN_LOCATION, DEFAULT_REQUEST_ID_HEADER,
};

/// ================================
/// Full client configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    pub logging: Option<LoggingConfig>,
}

/// ================================
/// Backend API
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,
    /// deadline for every call, refresh included
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_id_header: default_request_id_header(),
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// ================================
/// Credential storage
/// ================================
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageStrategy {
    /// refresh credential lives only in a server-managed http-only cookie
    #[default]
    CookiePreferred,
    /// refresh credential is written to client-readable durable storage
    LocalPersistent,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub strategy: StorageStrategy,
    /// None keeps the access credential in memory only
    pub session_path: Option<PathBuf>,
    /// invariant: required when strategy = local_persistent
    pub refresh_path: Option<PathBuf>,
}

/// ================================
/// Navigation side effects
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct NavigationConfig {
    #[serde(default = "default_login_location")]
    pub login_location: String,
    #[serde(default = "default_forbidden_location")]
    pub forbidden_location: String,
    /// machine-readable 403 code that marks a banned account
    #[serde(default = "default_banned_code")]
    pub banned_code: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            login_location: default_login_location(),
            forbidden_location: default_forbidden_location(),
            banned_code: default_banned_code(),
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_request_id_header() -> String {
    DEFAULT_REQUEST_ID_HEADER.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

fn default_login_location() -> String {
    DEFAULT_LOGIN_LOCATION.to_string()
}

fn default_forbidden_location() -> String {
    DEFAULT_FORBIDDEN_LOCATION.to_string()
}

fn default_banned_code() -> String {
    DEFAULT_BANNED_CODE.to_string()
}
