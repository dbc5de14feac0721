//! MIME encoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header encoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum encoded line length (RFC 2045 §6.7, §6.8).
const MAX_LINE_LENGTH: usize = 76;

/// Longest encoded-word RFC 2047 §2 allows.
const MAX_ENCODED_WORD: usize = 75;

/// Encodes data as Base64 on a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 broken into CRLF-terminated 76-column lines.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);
    for chunk in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        // Base64 output is pure ASCII
        result.push_str(&String::from_utf8_lossy(chunk));
        result.push_str("\r\n");
    }
    result
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Hard line breaks in the input become CRLF; long lines get soft breaks.
/// Whitespace at the end of a line is encoded so transports cannot strip it.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);
    let normalized = text.replace("\r\n", "\n");

    for (index, line) in normalized.split('\n').enumerate() {
        if index > 0 {
            result.push_str("\r\n");
        }
        encode_qp_line(line.as_bytes(), &mut result);
    }

    result
}

fn encode_qp_line(line: &[u8], result: &mut String) {
    let mut line_length = 0;

    for (i, &byte) in line.iter().enumerate() {
        let is_last = i + 1 == line.len();
        let literal = match byte {
            b'!'..=b'<' | b'>'..=b'~' => true,
            b' ' | b'\t' => !is_last,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };

        // Leave room for the trailing '=' of a soft break
        if line_length + width > MAX_LINE_LENGTH - 1 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            result.push(byte as char);
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        line_length += width;
    }
}

/// Returns true when `text` can travel as 7bit: ASCII only, no bare CR,
/// and every line within the 998-octet SMTP limit.
#[must_use]
pub fn is_seven_bit_safe(text: &str) -> bool {
    text.is_ascii()
        && !text.replace("\r\n", "\n").contains('\r')
        && text.split('\n').all(|line| line.len() <= 998)
}

/// Encodes a header value using RFC 2047 encoding when needed.
///
/// Format: `=?charset?B?encoded-text?=`. Long values are split into several
/// encoded-words separated by a space, each within the 75-character limit.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    // Only encode if necessary (contains non-ASCII or control characters)
    if text
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control())
        && !text.contains("=?")
    {
        return text.to_string();
    }

    let overhead = charset.len() + "=??B??=".len();
    // Base64 turns 3 bytes into 4 characters
    let max_bytes = (MAX_ENCODED_WORD - overhead) / 4 * 3;

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in text.chars() {
        if chunk.len() + c.len_utf8() > max_bytes {
            words.push(format!("=?{charset}?B?{}?=", encode_base64(chunk.as_bytes())));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(format!("=?{charset}?B?{}?=", encode_base64(chunk.as_bytes())));
    }

    words.join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_wrapped_lines() {
        let encoded = encode_base64_wrapped(&[0u8; 100]);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines.last(), Some(&""));
        assert_eq!(lines.concat(), encode_base64(&[0u8; 100]));
    }

    #[test]
    fn test_quoted_printable_keeps_line_breaks() {
        assert_eq!(encode_quoted_printable("Hello\nWorld"), "Hello\r\nWorld");
        assert_eq!(encode_quoted_printable("a\r\nb"), "a\r\nb");
    }

    #[test]
    fn test_quoted_printable_non_ascii_and_equals() {
        let encoded = encode_quoted_printable("Héllo = 1");
        assert_eq!(encoded, "H=C3=A9llo =3D 1");
    }

    #[test]
    fn test_quoted_printable_trailing_space() {
        assert_eq!(encode_quoted_printable("end \nnext"), "end=20\r\nnext");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let encoded = encode_quoted_printable(&"x".repeat(200));
        for line in encoded.split("\r\n") {
            assert!(line.len() <= 76);
        }
        assert_eq!(encoded.replace("=\r\n", ""), "x".repeat(200));
    }

    #[test]
    fn test_seven_bit_detection() {
        assert!(is_seven_bit_safe("plain\r\ntext"));
        assert!(!is_seven_bit_safe("héllo"));
        assert!(!is_seven_bit_safe("bare\rcr"));
        assert!(!is_seven_bit_safe(&"x".repeat(999)));
    }

    #[test]
    fn test_rfc2047_encode() {
        assert_eq!(encode_rfc2047("Hello", "utf-8"), "Hello");

        let encoded = encode_rfc2047("Héllo", "utf-8");
        assert_eq!(encoded, "=?utf-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_rfc2047_splits_long_values() {
        let encoded = encode_rfc2047(&"é".repeat(60), "utf-8");
        let words: Vec<&str> = encoded.split(' ').collect();
        assert!(words.len() > 1);
        for word in words {
            assert!(word.len() <= 75);
            assert!(word.starts_with("=?utf-8?B?"));
        }
    }

    proptest! {
        #[test]
        fn test_qp_lines_never_exceed_limit(text in "\\PC{0,300}") {
            let encoded = encode_quoted_printable(&text);
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= 76);
            }
        }
    }
}
