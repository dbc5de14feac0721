//! Client commands (RFC 5321 §4.1).

use std::fmt;

use crate::types::{Address, AuthMechanism};

/// A command line the client sends.
///
/// [`Display`](fmt::Display) renders the line without its CRLF;
/// [`Debug`](fmt::Debug) renders the same line with credentials masked, so
/// commands can be traced safely.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// Basic greeting, used when EHLO is refused.
    Helo {
        /// Name the client announces.
        hostname: String,
    },
    /// Extended greeting that lists server extensions.
    Ehlo {
        /// Name the client announces.
        hostname: String,
    },
    /// Switch the session to TLS.
    StartTls,
    /// Start SASL authentication.
    Auth {
        /// SASL mechanism.
        mechanism: AuthMechanism,
        /// Base64 initial response (RFC 4954 §4).
        initial_response: Option<String>,
    },
    /// Base64 line answering a 334 challenge.
    AuthResponse(String),
    /// Open a transaction with a reverse-path.
    MailFrom {
        /// Envelope sender.
        from: Address,
        /// Announced payload size (RFC 1870).
        size: Option<usize>,
    },
    /// Add a forward-path to the open transaction.
    RcptTo {
        /// Envelope recipient.
        to: Address,
    },
    /// Ask to send the payload.
    Data,
    /// Keep-alive check.
    Noop,
    /// End the session.
    Quit,
}

impl Command {
    /// Wire form of the command, CRLF included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        format!("{self}\r\n").into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Helo { hostname } => write!(f, "HELO {hostname}"),
            Self::Ehlo { hostname } => write!(f, "EHLO {hostname}"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::Auth {
                mechanism,
                initial_response: Some(response),
            } => write!(f, "AUTH {} {response}", mechanism.as_str()),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => write!(f, "AUTH {}", mechanism.as_str()),
            Self::AuthResponse(line) => f.write_str(line),
            Self::MailFrom { from, size } => {
                write!(f, "MAIL FROM:<{from}>")?;
                match size {
                    Some(size) => write!(f, " SIZE={size}"),
                    None => Ok(()),
                }
            }
            Self::RcptTo { to } => write!(f, "RCPT TO:<{to}>"),
            Self::Data => f.write_str("DATA"),
            Self::Noop => f.write_str("NOOP"),
            Self::Quit => f.write_str("QUIT"),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth { mechanism, .. } => write!(f, "AUTH {} <redacted>", mechanism.as_str()),
            Self::AuthResponse(_) => f.write_str("<redacted>"),
            other => fmt::Display::fmt(other, f),
        }
    }
}
