//! Client configuration, read from the environment.

use std::path::PathBuf;

use thiserror::Error;

pub const API_URL_VAR: &str = "TASKDESK_API_URL";
pub const PRODUCTION_VAR: &str = "TASKDESK_PRODUCTION";
pub const SESSION_FILE_VAR: &str = "TASKDESK_SESSION_FILE";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid API url '{value}': {reason}")]
    InvalidApiUrl { value: String, reason: String },

    #[error("invalid value '{value}' for {name} (expected true/false)")]
    InvalidFlag { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// REST base URL without a trailing slash.
    api_url: String,

    pub production: bool,

    /// Durable session file for native clients; `None` keeps the session in
    /// memory only.
    pub session_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Configuration for `api_url` with development defaults and no session file.
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: normalize_api_url(api_url)?,
            production: false,
            session_file: None,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup(API_URL_VAR).unwrap_or_else(|| {
            tracing::warn!("{API_URL_VAR} not set; using {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });

        let production = match lookup(PRODUCTION_VAR) {
            Some(raw) => parse_flag(PRODUCTION_VAR, &raw)?,
            None => false,
        };

        let session_file = match lookup(SESSION_FILE_VAR) {
            Some(raw) if raw.trim().eq_ignore_ascii_case("none") => None,
            Some(raw) if !raw.trim().is_empty() => Some(PathBuf::from(raw.trim())),
            _ => default_session_file(),
        };

        Ok(Self {
            api_url: normalize_api_url(&api_url)?,
            production,
            session_file,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn is_development(&self) -> bool {
        !self.production
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Absolute URL for an API path such as `/users/7`.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.api_url, path)
        } else {
            format!("{}/{}", self.api_url, path)
        }
    }
}

fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidApiUrl {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidApiUrl {
            value: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(trimmed.to_string())
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: raw.to_string(),
        }),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn default_session_file() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("taskdesk").join("session.json"))
}

// The browser keeps the session in localStorage instead.
#[cfg(target_arch = "wasm32")]
fn default_session_file() -> Option<PathBuf> {
    None
}
