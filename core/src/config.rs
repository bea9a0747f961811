//! Endpoint configuration shared read-only by every outbound call.
//!
//! # Design
//! Built once at startup (usually from the environment) and handed to the
//! client by value. Nothing mutates it afterwards.

use std::time::Duration;

use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5000);

pub const ENV_BASE_URL: &str = "EXTERNAL_API_BASE_URL";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "EXTERNAL_API_CONNECT_TIMEOUT_MS";
pub const ENV_READ_TIMEOUT_MS: &str = "EXTERNAL_API_READ_TIMEOUT_MS";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid value for {key}: '{value}' is not a number of milliseconds")]
    InvalidTimeout { key: &'static str, value: String },
}

/// Base URL and timeouts of the upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    base_url: String,
    /// Advisory only; the transport does not enforce it.
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl EndpointConfig {
    /// Validate `base_url` and build a config with default timeouts.
    ///
    /// The URL must be absolute `http` or `https`. A trailing slash is
    /// stripped so paths can be appended verbatim.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(ConfigError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "base URL must not carry a query or fragment".to_string(),
            });
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Read the configuration from `EXTERNAL_API_*` environment variables,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;
        if let Some(ms) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            config.connect_timeout = parse_millis(ENV_CONNECT_TIMEOUT_MS, &ms)?;
        }
        if let Some(ms) = lookup(ENV_READ_TIMEOUT_MS) {
            config.read_timeout = parse_millis(ENV_READ_TIMEOUT_MS, &ms)?;
        }
        Ok(config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

fn parse_millis(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidTimeout {
            key,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = EndpointConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EndpointConfig::default());
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.read_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = EndpointConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://localhost:3000/"),
            (ENV_CONNECT_TIMEOUT_MS, "1500"),
            (ENV_READ_TIMEOUT_MS, "250"),
        ]))
        .unwrap();
        assert_eq!(config.base_url(), "http://localhost:3000");
        assert_eq!(config.connect_timeout, Duration::from_millis(1500));
        assert_eq!(config.read_timeout, Duration::from_millis(250));
    }

    #[test]
    fn malformed_timeout_is_rejected() {
        let err = EndpointConfig::from_lookup(lookup(&[(ENV_READ_TIMEOUT_MS, "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidTimeout {
                key: ENV_READ_TIMEOUT_MS,
                value: "soon".to_string(),
            }
        );
    }

    #[test]
    fn relative_base_url_is_rejected() {
        let err = EndpointConfig::new("/posts").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let err = EndpointConfig::new("ftp://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }
}
