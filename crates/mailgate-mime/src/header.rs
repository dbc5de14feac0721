//! MIME header handling.

use crate::error::{Error, Result};
use std::fmt::Write as _;

/// Preferred length of a header line before folding (RFC 5322 §2.1.1).
const FOLD_AT: usize = 78;

/// Ordered collection of email headers.
///
/// Names keep the caller's spelling, lookups are case-insensitive, and
/// repeated names are kept as separate fields in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header field, keeping any earlier field with the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Checks whether a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of header fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns an iterator over all fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Appends every field to `out` as CRLF-terminated, folded lines.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is not a valid field name or a value
    /// contains a line break, either of which would let a caller forge
    /// additional header fields.
    pub fn write_to(&self, out: &mut String) -> Result<()> {
        for (name, value) in &self.fields {
            validate_field(name, value)?;
            write_folded(out, name, value);
        }
        Ok(())
    }
}

fn validate_field(name: &str, value: &str) -> Result<()> {
    // RFC 5322 §3.6.8: printable US-ASCII except colon
    if name.is_empty() || !name.bytes().all(|b| (33..=126).contains(&b) && b != b':') {
        return Err(Error::InvalidHeader(format!("Bad field name {name:?}")));
    }
    if value.contains(['\r', '\n']) {
        return Err(Error::InvalidHeader(format!(
            "Line break in value of {name}"
        )));
    }
    Ok(())
}

/// Writes `name: value`, folding at whitespace when the line grows past
/// [`FOLD_AT`]. Words longer than a line are left intact.
fn write_folded(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, "{name}:");
    let mut line_length = name.len() + 1;

    for (index, word) in value.split(' ').enumerate() {
        // A continuation line must carry something besides whitespace
        if index > 0 && !word.is_empty() && line_length + 1 + word.len() > FOLD_AT {
            out.push_str("\r\n");
            line_length = 0;
        }
        out.push(' ');
        out.push_str(word);
        line_length += 1 + word.len();
    }

    out.push_str("\r\n");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn render(headers: &Headers) -> String {
        let mut out = String::new();
        headers.write_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
        assert!(headers.contains("CONTENT-TYPE"));
    }

    #[test]
    fn test_duplicates_kept_in_order() {
        let mut headers = Headers::new();
        headers.add("X-Tag", "one");
        headers.add("Subject", "Hi");
        headers.add("x-tag", "two");

        assert_eq!(headers.get_all("X-Tag"), vec!["one", "two"]);
        assert_eq!(render(&headers), "X-Tag: one\r\nSubject: Hi\r\nx-tag: two\r\n");
    }

    #[test]
    fn test_headers_len() {
        let mut headers = Headers::new();
        assert!(headers.is_empty());
        headers.add("To", "alice@example.com");
        headers.add("To", "bob@example.com");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.iter().count(), 2);
    }

    #[test]
    fn test_long_values_fold() {
        let mut headers = Headers::new();
        let value = vec!["recipient@example.com,"; 8].join(" ");
        headers.add("To", value.clone());

        let out = render(&headers);
        let lines: Vec<&str> = out.trim_end().split("\r\n").collect();
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.len() <= 78);
        }
        for continuation in &lines[1..] {
            assert!(continuation.starts_with(' '));
        }
        assert_eq!(out.replace("\r\n ", " "), format!("To: {value}\r\n"));
    }

    #[test]
    fn test_fold_never_yields_blank_line() {
        let mut headers = Headers::new();
        let value = format!("{}  ", "a".repeat(75));
        headers.add("X-Gap", value.clone());

        let out = render(&headers);
        for line in out.trim_end().split("\r\n") {
            assert!(!line.trim().is_empty());
        }
        assert_eq!(out.replace("\r\n ", " "), format!("X-Gap: {value}\r\n"));
    }

    #[test]
    fn test_rejects_header_injection() {
        let mut headers = Headers::new();
        headers.add("X-Note", "hello\r\nBcc: victim@example.com");
        assert!(headers.write_to(&mut String::new()).is_err());

        let mut headers = Headers::new();
        headers.add("Bad Name", "x");
        assert!(headers.write_to(&mut String::new()).is_err());
    }
}
