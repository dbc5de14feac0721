//! MIME entity tree and its serialization.

use crate::content_type::ContentType;
use crate::encoding::{encode_quoted_printable, is_seven_bit_safe};
use crate::error::Result;
use crate::header::Headers;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fmt;

/// Transfer encodings the composer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII, written as-is.
    SevenBit,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Base64 encoding.
    Base64,
}

impl TransferEncoding {
    /// Picks the encoding for a text body: 7bit when safe, else Quoted-Printable.
    #[must_use]
    pub fn for_text(text: &str) -> Self {
        if is_seven_bit_safe(text) {
            Self::SevenBit
        } else {
            Self::QuotedPrintable
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

/// Body of a MIME entity.
#[derive(Debug, Clone)]
pub enum PartBody {
    /// Already transfer-encoded content with CRLF line endings.
    Encoded(String),
    /// Child entities separated by `boundary`.
    Multipart {
        /// Boundary string, also present in the Content-Type header.
        boundary: String,
        /// Children in order.
        parts: Vec<Part>,
    },
}

/// MIME entity: headers plus body.
#[derive(Debug, Clone)]
pub struct Part {
    /// Entity headers (Content-Type and friends).
    pub headers: Headers,
    /// Entity body.
    pub body: PartBody,
}

impl Part {
    /// Creates a text entity, choosing and applying the transfer encoding.
    #[must_use]
    pub fn text(content_type: &ContentType, text: &str) -> Self {
        let encoding = TransferEncoding::for_text(text);
        let body = match encoding {
            TransferEncoding::QuotedPrintable => encode_quoted_printable(text),
            _ => text.replace("\r\n", "\n").replace('\n', "\r\n"),
        };

        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        headers.add("Content-Transfer-Encoding", encoding.to_string());
        Self {
            headers,
            body: PartBody::Encoded(body),
        }
    }

    /// Creates an entity from prepared headers and an encoded body.
    #[must_use]
    pub const fn encoded(headers: Headers, body: String) -> Self {
        Self {
            headers,
            body: PartBody::Encoded(body),
        }
    }

    /// Creates a multipart entity with a fresh boundary.
    ///
    /// `make_type` receives the boundary and returns the Content-Type, e.g.
    /// [`ContentType::multipart_mixed`].
    #[must_use]
    pub fn multipart(make_type: impl FnOnce(String) -> ContentType, parts: Vec<Self>) -> Self {
        let boundary = new_boundary();
        let mut headers = Headers::new();
        headers.add("Content-Type", make_type(boundary.clone()).to_string());
        Self {
            headers,
            body: PartBody::Multipart { boundary, parts },
        }
    }

    /// Serializes the entity, preceded by `outer` headers when given (used
    /// for the top-level message headers).
    ///
    /// # Errors
    ///
    /// Returns an error if any header cannot be written safely.
    pub fn write_to(&self, outer: Option<&Headers>, out: &mut String) -> Result<()> {
        if let Some(outer) = outer {
            outer.write_to(out)?;
        }
        self.headers.write_to(out)?;
        out.push_str("\r\n");

        match &self.body {
            PartBody::Encoded(body) => out.push_str(body),
            PartBody::Multipart { boundary, parts } => {
                for part in parts {
                    out.push_str("--");
                    out.push_str(boundary);
                    out.push_str("\r\n");
                    part.write_to(None, out)?;
                    out.push_str("\r\n");
                }
                out.push_str("--");
                out.push_str(boundary);
                out.push_str("--\r\n");
            }
        }

        Ok(())
    }
}

/// Generates a multipart boundary. `=_` never occurs in Quoted-Printable or
/// Base64 output.
#[must_use]
pub fn new_boundary() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("=_mailgate_{suffix}")
}
