//! Error types for the dispatch layer.

use thiserror::Error;

/// Errors that can occur while dispatching mail.
#[derive(Debug, Error)]
pub enum Error {
    /// Endpoint URL could not be used. `url` has any password redacted.
    #[error("Invalid SMTP endpoint {url}: {reason}")]
    InvalidEndpoint {
        /// Redacted endpoint URL.
        url: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Neither the setting nor the fallback environment variable is set and
    /// the console fallback is disabled.
    #[error("no SMTP endpoint configured")]
    NoEndpoint,

    /// SMTP conversation failed.
    #[error("SMTP error: {0}")]
    Transport(#[from] mailgate_smtp::Error),

    /// Connection could not be established in time.
    #[error("Timed out connecting to {host}:{port}")]
    ConnectTimeout {
        /// Endpoint host.
        host: String,
        /// Endpoint port.
        port: u16,
    },

    /// Request rejected before any network activity.
    #[error("Invalid mail request: {0}")]
    Validation(String),

    /// Message could not be composed.
    #[error("Composition error: {0}")]
    Mime(#[from] mailgate_mime::Error),

    /// Configuration document could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Returns true for endpoint and configuration problems.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidEndpoint { .. } | Self::NoEndpoint | Self::Config(_)
        )
    }

    /// Returns true for network and SMTP failures.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ConnectTimeout { .. })
    }

    /// Returns true when the request itself was rejected.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Mime(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert!(Error::NoEndpoint.is_configuration());
        assert!(!Error::NoEndpoint.is_transport());
        assert!(
            Error::ConnectTimeout {
                host: "mx".into(),
                port: 25
            }
            .is_transport()
        );
        assert!(Error::Transport(mailgate_smtp::Error::ConnectionClosed).is_transport());
        assert!(Error::Validation("no recipients".into()).is_validation());
    }

    #[test]
    fn test_no_endpoint_message() {
        assert_eq!(Error::NoEndpoint.to_string(), "no SMTP endpoint configured");
    }
}
