//! SMTP endpoint URLs and their resolution.
//!
//! Endpoints are written `smtp://[user[:password]@]host[:port]`. Port 465
//! means implicit TLS; any other port starts in plain text.

use std::fmt;
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::settings::SettingsStore;

/// Port used when the URL has none.
pub const DEFAULT_PORT: u16 = 25;

/// Port that implies TLS from the first byte (RFC 8314).
pub const IMPLICIT_TLS_PORT: u16 = 465;

/// Host used when the URL has none.
pub const DEFAULT_HOST: &str = "localhost";

/// Login for an endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name (percent-decoded).
    pub username: String,
    /// Password (percent-decoded, empty when the URL has none).
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A parsed SMTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Whether TLS starts before the greeting.
    pub implicit_tls: bool,
    /// Login, when the URL carries one.
    pub credentials: Option<Credentials>,
}

impl EndpointConfig {
    /// Parses an endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the URL does not parse, its
    /// scheme is not `smtp`, or its credentials are not valid UTF-8.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidEndpoint {
            url: redact(raw),
            reason,
        };

        let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "smtp" {
            return Err(invalid(format!(
                "unsupported scheme {:?}, expected \"smtp\"",
                url.scheme()
            )));
        }

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => DEFAULT_HOST.to_string(),
        };
        let port = url.port().unwrap_or(DEFAULT_PORT);

        let credentials = if url.username().is_empty() {
            None
        } else {
            let decode = |part: &str| {
                percent_decode_str(part)
                    .decode_utf8()
                    .map(|s| s.into_owned())
                    .map_err(|e| invalid(format!("credentials are not UTF-8: {e}")))
            };
            Some(Credentials {
                username: decode(url.username())?,
                password: url.password().map(decode).transpose()?.unwrap_or_default(),
            })
        };

        Ok(Self {
            host,
            port,
            implicit_tls: port == IMPLICIT_TLS_PORT,
            credentials,
        })
    }
}

impl fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.credentials {
            Some(credentials) => write!(
                f,
                "smtp://{}@{}:{}",
                credentials.username, self.host, self.port
            ),
            None => write!(f, "smtp://{}:{}", self.host, self.port),
        }
    }
}

/// Replaces the password of a URL-shaped string with `****`. Works on input
/// that does not parse as a URL.
#[must_use]
pub fn redact(raw: &str) -> String {
    let Some(scheme_end) = raw.find("://") else {
        return raw.to_string();
    };
    let authority_start = scheme_end + 3;
    let authority_end = raw[authority_start..]
        .find(['/', '?', '#'])
        .map_or(raw.len(), |i| authority_start + i);
    let authority = &raw[authority_start..authority_end];

    let Some(at) = authority.rfind('@') else {
        return raw.to_string();
    };
    let Some(colon) = authority[..at].find(':') else {
        return raw.to_string();
    };

    format!(
        "{}{}:****{}",
        &raw[..authority_start],
        &authority[..colon],
        &raw[authority_start + at..]
    )
}

/// Finds the active endpoint: the settings value first, then the fallback
/// environment variable. Both are read on every call.
#[derive(Clone)]
pub struct EndpointResolver {
    settings: Arc<dyn SettingsStore>,
    setting_key: String,
    fallback_env: String,
}

impl fmt::Debug for EndpointResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointResolver")
            .field("setting_key", &self.setting_key)
            .field("fallback_env", &self.fallback_env)
            .finish_non_exhaustive()
    }
}

impl EndpointResolver {
    /// Creates a resolver reading the keys named in `config`.
    #[must_use]
    pub fn new(settings: Arc<dyn SettingsStore>, config: &DispatchConfig) -> Self {
        Self {
            settings,
            setting_key: config.setting_key.clone(),
            fallback_env: config.fallback_env.clone(),
        }
    }

    /// Settings key this resolver reads.
    #[must_use]
    pub fn setting_key(&self) -> &str {
        &self.setting_key
    }

    /// Returns the configured endpoint, or `None` when neither source has one.
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if a configured URL is unusable.
    pub fn resolve(&self) -> Result<Option<EndpointConfig>> {
        let raw = self
            .settings
            .get(&self.setting_key)
            .filter(|value| !value.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.fallback_env)
                    .ok()
                    .filter(|value| !value.trim().is_empty())
            });

        raw.as_deref().map(EndpointConfig::parse).transpose()
    }
}
