use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const ENV_BASE_URL: &str = "QUIZ_API_BASE_URL";
pub const ENV_API_TOKEN: &str = "QUIZ_API_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "QUIZ_HTTP_TIMEOUT_SECS";

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} is not set")]
    Missing { var: &'static str },

    #[error("invalid base URL: {raw}")]
    InvalidBaseUrl { raw: String },

    #[error("invalid value for {var}: {raw}")]
    InvalidNumber { var: &'static str, raw: String },
}

/// Connection settings for the quiz API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    base_url: String,
    api_token: Option<String>,
    timeout: Duration,
}

impl BackendConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` unless `base_url` is an absolute http(s) URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = base_url.into();
        let trimmed = raw.trim().trim_end_matches('/').to_owned();
        match Url::parse(&trimmed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self {
                base_url: trimmed,
                api_token: None,
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            }),
            _ => Err(ConfigError::InvalidBaseUrl { raw }),
        }
    }

    #[must_use]
    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        self.api_token = token
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `QUIZ_API_BASE_URL`, `QUIZ_API_TOKEN` and `QUIZ_HTTP_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the base URL is missing or any value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Same as `from_env` with an injectable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the base URL is missing or any value is invalid.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(ENV_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing { var: ENV_BASE_URL })?;
        let timeout_secs = match lookup(ENV_TIMEOUT_SECS) {
            Some(raw) => parse_number(ENV_TIMEOUT_SECS, &raw)?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self::new(base_url)?
            .with_api_token(lookup(ENV_API_TOKEN))
            .with_timeout(Duration::from_secs(timeout_secs)))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Parse a non-negative integer setting.
///
/// # Errors
///
/// Returns `ConfigError::InvalidNumber` naming `var` when `raw` is not a `u64`.
pub fn parse_number(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidNumber {
            var,
            raw: raw.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_all_vars_and_strips_trailing_slash() {
        let config = BackendConfig::from_vars(lookup(&[
            (ENV_BASE_URL, "https://api.example.test/v1/"),
            (ENV_API_TOKEN, " secret "),
            (ENV_TIMEOUT_SECS, "4"),
        ]))
        .unwrap();

        assert_eq!(config.base_url(), "https://api.example.test/v1");
        assert_eq!(config.api_token(), Some("secret"));
        assert_eq!(config.timeout(), Duration::from_secs(4));
    }

    #[test]
    fn missing_base_url_is_reported() {
        let err = BackendConfig::from_vars(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing { var: ENV_BASE_URL });
    }

    #[test]
    fn rejects_bad_url_and_bad_timeout() {
        assert!(matches!(
            BackendConfig::new("ftp://example.test"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        let err = BackendConfig::from_vars(lookup(&[
            (ENV_BASE_URL, "http://localhost:8080"),
            (ENV_TIMEOUT_SECS, "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { var: ENV_TIMEOUT_SECS, .. }));
    }

    #[test]
    fn blank_token_is_dropped() {
        let config = BackendConfig::new("http://localhost:8080")
            .unwrap()
            .with_api_token(Some("   ".into()));
        assert_eq!(config.api_token(), None);
    }
}
