//! Header-level addresses: mailboxes with optional display names.

use crate::encoding::encode_rfc2047;
use crate::error::{Error, Result};
use std::fmt;

/// Mailbox (optional display name + address), as written in `From:`/`To:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Bare address, `local@domain`.
    pub address: String,
}

impl Mailbox {
    /// Creates a mailbox with just an address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    /// Creates a mailbox with a display name and address.
    #[must_use]
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }

    /// Parses `addr@example.com`, `<addr@example.com>` or
    /// `Display Name <addr@example.com>` (the name may be quoted).
    ///
    /// # Errors
    ///
    /// Returns an error on an unterminated angle bracket or an empty address.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let Some(open) = find_unquoted(input, '<') else {
            if input.is_empty() {
                return Err(Error::InvalidAddress("Empty address".into()));
            }
            return Ok(Self::new(input));
        };

        let rest = &input[open + 1..];
        let close = rest
            .find('>')
            .ok_or_else(|| Error::InvalidAddress(format!("Unterminated '<' in {input:?}")))?;
        let address = rest[..close].trim();
        if address.is_empty() {
            return Err(Error::InvalidAddress(format!("Empty address in {input:?}")));
        }

        let name = unquote(input[..open].trim());
        Ok(Self {
            name: (!name.is_empty()).then_some(name),
            address: address.to_string(),
        })
    }

    /// Formats the mailbox for a header, RFC 2047-encoding a non-ASCII name.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        match &self.name {
            None => self.address.clone(),
            Some(name) if name.is_ascii() => {
                if name.chars().all(|c| c.is_ascii_alphanumeric() || " !#$%&'*+-/=?^_`{|}~".contains(c)) {
                    format!("{name} <{}>", self.address)
                } else {
                    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                    format!("\"{escaped}\" <{}>", self.address)
                }
            }
            Some(name) => format!("{} <{}>", encode_rfc2047(name, "utf-8"), self.address),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

/// Parses a comma-separated address list. Commas inside quoted display
/// names or angle brackets do not split entries; empty entries are skipped.
///
/// # Errors
///
/// Returns an error if any entry is malformed.
pub fn parse_address_list(input: &str) -> Result<Vec<Mailbox>> {
    let mut entries = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' if !in_angle => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' if !in_quotes && !in_angle => {
                entries.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&input[start..]);

    entries
        .into_iter()
        .filter(|entry| !entry.trim().is_empty())
        .map(Mailbox::parse)
        .collect()
}

fn find_unquoted(input: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == needle && !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

fn unquote(name: &str) -> String {
    name.strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .map_or_else(
            || name.to_string(),
            |inner| inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let mailbox = Mailbox::parse("  user@example.com ").unwrap();
        assert_eq!(mailbox, Mailbox::new("user@example.com"));
    }

    #[test]
    fn test_parse_named_address() {
        let mailbox = Mailbox::parse("John Doe <john@example.com>").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("John Doe"));
        assert_eq!(mailbox.address, "john@example.com");
    }

    #[test]
    fn test_parse_quoted_name_with_comma() {
        let mailbox = Mailbox::parse("\"Doe, John\" <john@example.com>").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("Doe, John"));
    }

    #[test]
    fn test_parse_rejects_broken_input() {
        assert!(Mailbox::parse("").is_err());
        assert!(Mailbox::parse("Name <john@example.com").is_err());
        assert!(Mailbox::parse("Name <>").is_err());
    }

    #[test]
    fn test_list_splits_on_top_level_commas() {
        let list =
            parse_address_list("a@example.com, \"Doe, John\" <john@example.com>,, b@example.com")
                .unwrap();
        let addresses: Vec<&str> = list.iter().map(|m| m.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec!["a@example.com", "john@example.com", "b@example.com"]
        );
    }

    #[test]
    fn test_header_value_quoting() {
        assert_eq!(
            Mailbox::with_name("John Doe", "john@example.com").to_header_value(),
            "John Doe <john@example.com>"
        );
        assert_eq!(
            Mailbox::with_name("Doe, John", "john@example.com").to_header_value(),
            "\"Doe, John\" <john@example.com>"
        );
        assert_eq!(
            Mailbox::with_name("Jöhn", "john@example.com").to_header_value(),
            "=?utf-8?B?SsO2aG4=?= <john@example.com>"
        );
    }
}
