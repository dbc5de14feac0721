//! SMTP reply types.

use std::fmt;

/// SMTP reply from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code (e.g., 250).
    pub code: ReplyCode,
    /// Reply message lines.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns the full message as a single string.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }

    /// Returns the RFC 3463 enhanced status code carried on the first line.
    #[must_use]
    pub fn enhanced_status(&self) -> Option<EnhancedStatus> {
        self.message
            .first()
            .and_then(|line| line.split_whitespace().next())
            .and_then(EnhancedStatus::parse)
    }

    /// Converts a non-success reply into an [`Error`](crate::Error).
    #[must_use]
    pub fn into_error(self) -> crate::Error {
        crate::Error::smtp_error(self.code.as_u16(), self.message_text())
    }
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true if this is a success code (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true if this is an intermediate reply (3xx).
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.0 >= 500 && self.0 < 600
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Reply codes the client branches on
impl ReplyCode {
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 235 Authentication succeeded
    pub const AUTH_SUCCESS: Self = Self(235);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 334 Continue with authentication
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);
    /// 421 Service not available, closing transmission channel
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 500 Syntax error, command unrecognized
    pub const SYNTAX_ERROR: Self = Self(500);
    /// 502 Command not implemented
    pub const NOT_IMPLEMENTED: Self = Self(502);
    /// 535 Authentication credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 Mailbox unavailable (not found, access denied)
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);
}

/// Enhanced mail system status code (RFC 3463), e.g. `5.1.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnhancedStatus {
    /// Class: 2 (success), 4 (persistent transient) or 5 (permanent).
    pub class: u8,
    /// Subject sub-code.
    pub subject: u16,
    /// Detail sub-code.
    pub detail: u16,
}

impl EnhancedStatus {
    /// Parses `class.subject.detail`.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let mut parts = token.split('.');
        let class = parts.next()?.parse().ok()?;
        let subject = parts.next()?.parse().ok()?;
        let detail = parts.next()?.parse().ok()?;
        if parts.next().is_some() || !matches!(class, 2 | 4 | 5) {
            return None;
        }
        Some(Self {
            class,
            subject,
            detail,
        })
    }
}

impl fmt::Display for EnhancedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.class, self.subject, self.detail)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::similar_names)]
mod tests {
    use super::*;

    mod reply_code_tests {
        use super::*;

        #[test]
        fn test_classes() {
            assert!(ReplyCode::OK.is_success());
            assert!(ReplyCode::CLOSING.is_success());
            assert!(ReplyCode::START_DATA.is_intermediate());
            assert!(ReplyCode::SERVICE_UNAVAILABLE.is_transient());
            assert!(ReplyCode::AUTH_FAILED.is_permanent());
            assert!(!ReplyCode::MAILBOX_UNAVAILABLE.is_success());
        }

        #[test]
        fn test_display() {
            assert_eq!(ReplyCode::OK.to_string(), "250");
        }
    }

    mod reply_tests {
        use super::*;

        #[test]
        fn test_message_text_multiple_lines() {
            let reply = Reply::new(
                ReplyCode::SERVICE_READY,
                vec!["smtp.example.com ESMTP".to_string(), "Ready".to_string()],
            );
            assert_eq!(reply.message_text(), "smtp.example.com ESMTP\nReady");
        }

        #[test]
        fn test_enhanced_status_present() {
            let reply = Reply::new(
                ReplyCode::MAILBOX_UNAVAILABLE,
                vec!["5.1.1 <nobody@example.com>: user unknown".to_string()],
            );
            let status = reply.enhanced_status().unwrap();
            assert_eq!(status.class, 5);
            assert_eq!(status.subject, 1);
            assert_eq!(status.detail, 1);
            assert_eq!(status.to_string(), "5.1.1");
        }

        #[test]
        fn test_enhanced_status_absent() {
            let reply = Reply::new(ReplyCode::OK, vec!["OK".to_string()]);
            assert!(reply.enhanced_status().is_none());
            assert!(EnhancedStatus::parse("3.1.1").is_none());
            assert!(EnhancedStatus::parse("2.0.0.0").is_none());
        }

        #[test]
        fn test_into_error_keeps_code() {
            let reply = Reply::new(ReplyCode::AUTH_FAILED, vec!["bad creds".to_string()]);
            let err = reply.into_error();
            assert!(err.is_permanent());
            assert_eq!(err.to_string(), "SMTP error 535: bad creds");
        }
    }
}
