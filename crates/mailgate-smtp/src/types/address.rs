//! Envelope address type.

use crate::error::{Error, Result};

/// Longest path RFC 5321 §4.5.3.1.3 allows, excluding the angle brackets.
const MAX_PATH_LENGTH: usize = 254;

/// Longest local part RFC 5321 §4.5.3.1.1 allows.
const MAX_LOCAL_PART_LENGTH: usize = 64;

/// Bare email address for the SMTP envelope (`MAIL FROM` / `RCPT TO`).
///
/// Display names and angle brackets are not accepted here; the address is
/// written between `<` and `>` verbatim, so anything that could break out of
/// the command line is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        if addr.len() > MAX_PATH_LENGTH {
            return Err(Error::InvalidAddress(format!(
                "Address longer than {MAX_PATH_LENGTH} characters"
            )));
        }

        if let Some(bad) = addr
            .chars()
            .find(|c| c.is_control() || c.is_whitespace() || matches!(c, '<' | '>'))
        {
            return Err(Error::InvalidAddress(format!(
                "Address contains forbidden character {bad:?}"
            )));
        }

        let Some((local, domain)) = addr.rsplit_once('@') else {
            return Err(Error::InvalidAddress("Address must contain @".into()));
        };

        if local.is_empty() || domain.is_empty() {
            return Err(Error::InvalidAddress(
                "Local and domain parts cannot be empty".into(),
            ));
        }

        if local.len() > MAX_LOCAL_PART_LENGTH {
            return Err(Error::InvalidAddress(format!(
                "Local part longer than {MAX_LOCAL_PART_LENGTH} characters"
            )));
        }

        // Quoted local parts may carry '@'; the domain never does.
        if domain.contains('@') || (!local.starts_with('"') && local.contains('@')) {
            return Err(Error::InvalidAddress(
                "Address must have exactly one @".into(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
