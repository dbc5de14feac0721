//! Dispatcher configuration.
//!
//! ```
//! use mailgate::DispatchConfig;
//!
//! let config = DispatchConfig::from_json(r#"{ "consoleFallback": true, "pool": { "maxConnections": 2 } }"#)?;
//! assert!(config.console_fallback);
//! assert_eq!(config.pool.max_connections, 2);
//! assert_eq!(config.setting_key, "smtpUrl");
//! # Ok::<(), mailgate::Error>(())
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default settings key holding the endpoint URL.
pub const DEFAULT_SETTING_KEY: &str = "smtpUrl";

/// Default environment variable consulted when the setting is absent.
pub const DEFAULT_FALLBACK_ENV: &str = "MAIL_URL";

/// Default number of concurrent connections per pool.
pub const DEFAULT_MAX_CONNECTIONS: usize = 5;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Configuration for a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DispatchConfig {
    /// Settings key holding the endpoint URL.
    pub setting_key: String,

    /// Environment variable read when the setting is absent.
    pub fallback_env: String,

    /// Dump messages to stdout when no endpoint is configured (dev mode).
    /// When off, a missing endpoint is an error.
    pub console_fallback: bool,

    /// Connection pool parameters.
    pub pool: PoolConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            setting_key: DEFAULT_SETTING_KEY.to_string(),
            fallback_env: DEFAULT_FALLBACK_ENV.to_string(),
            console_fallback: false,
            pool: PoolConfig::default(),
        }
    }
}

impl DispatchConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON for this type.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the settings key.
    #[must_use]
    pub fn setting_key(mut self, key: impl Into<String>) -> Self {
        self.setting_key = key.into();
        self
    }

    /// Sets the fallback environment variable.
    #[must_use]
    pub fn fallback_env(mut self, name: impl Into<String>) -> Self {
        self.fallback_env = name.into();
        self
    }

    /// Enables or disables the console fallback.
    #[must_use]
    pub const fn console_fallback(mut self, enabled: bool) -> Self {
        self.console_fallback = enabled;
        self
    }

    /// Replaces the pool parameters.
    #[must_use]
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }
}

/// Parameters shared by every pool the dispatcher creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolConfig {
    /// Maximum concurrent transactions (and open connections).
    pub max_connections: usize,

    /// Maximum idle connections kept for reuse.
    pub max_idle: usize,

    /// Name announced in EHLO/HELO.
    pub client_hostname: String,

    /// Timeout for TCP connect, TLS handshake and greeting, and for the
    /// NOOP that checks an idle connection before reuse.
    pub connect_timeout_secs: u64,

    /// Upgrade plain connections with STARTTLS when the server offers it.
    pub starttls: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_idle: DEFAULT_MAX_CONNECTIONS,
            client_hostname: "localhost".to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            starttls: true,
        }
    }
}

impl PoolConfig {
    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.setting_key, "smtpUrl");
        assert_eq!(config.fallback_env, "MAIL_URL");
        assert!(!config.console_fallback);
        assert_eq!(config.pool.max_connections, 5);
        assert_eq!(config.pool.max_idle, 5);
        assert_eq!(config.pool.connect_timeout(), Duration::from_secs(30));
        assert!(config.pool.starttls);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = DispatchConfig::from_json(r#"{"fallbackEnv": "SMTP_URL"}"#).unwrap();
        assert_eq!(config.fallback_env, "SMTP_URL");
        assert_eq!(config.setting_key, "smtpUrl");
        assert_eq!(config.pool, PoolConfig::default());
    }

    #[test]
    fn test_bad_json_is_configuration_error() {
        let err = DispatchConfig::from_json("{").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_builder() {
        let config = DispatchConfig::new()
            .setting_key("mail.url")
            .console_fallback(true);
        assert_eq!(config.setting_key, "mail.url");
        assert!(config.console_fallback);
    }
}
