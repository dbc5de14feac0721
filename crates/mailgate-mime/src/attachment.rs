//! Attachment descriptors.

use crate::content_type::ContentType;
use crate::encoding::{encode_base64_wrapped, encode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;

/// How a client should present an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Disposition {
    /// Offered as a separate file.
    #[default]
    Attachment,
    /// Displayed in the body, usually referenced by Content-ID.
    Inline,
}

impl Disposition {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Inline => "inline",
        }
    }
}

/// A file carried by a message. The encoder treats it as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct Attachment {
    /// File name shown to the recipient.
    pub filename: Option<String>,
    /// Explicit content type; guessed from the file name when absent.
    pub content_type: Option<String>,
    /// Raw content.
    pub content: Vec<u8>,
    /// Content-ID for inline references (`cid:`), without angle brackets.
    pub content_id: Option<String>,
    /// Attachment or inline.
    pub disposition: Disposition,
}

impl Attachment {
    /// Creates an attachment from raw bytes.
    #[must_use]
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Sets the file name.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Sets an explicit content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Marks the attachment inline with the given Content-ID.
    #[must_use]
    pub fn inline(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self.disposition = Disposition::Inline;
        self
    }

    /// Resolves the content type: explicit, guessed from the file name, or
    /// `application/octet-stream`.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit content type does not parse.
    pub fn resolved_content_type(&self) -> Result<ContentType> {
        if let Some(explicit) = &self.content_type {
            return ContentType::parse(explicit);
        }
        let guessed = self
            .filename
            .as_deref()
            .map_or(mime_guess::mime::APPLICATION_OCTET_STREAM, |name| {
                mime_guess::from_path(name).first_or_octet_stream()
            });
        ContentType::parse(guessed.essence_str())
    }

    /// Headers and base64 body of the MIME part for this attachment.
    pub(crate) fn to_part(&self) -> Result<(Headers, String)> {
        let mut content_type = self.resolved_content_type()?;
        let mut disposition = self.disposition.as_str().to_string();

        if let Some(filename) = &self.filename {
            if filename.contains(['\r', '\n', '"']) {
                return Err(Error::InvalidAttachment(format!(
                    "Unsafe file name {filename:?}"
                )));
            }
            let encoded = encode_rfc2047(filename, "utf-8");
            content_type = content_type.with_parameter("name", encoded.clone());
            disposition = format!("{disposition}; filename=\"{encoded}\"");
        }

        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        headers.add("Content-Transfer-Encoding", "base64");
        headers.add("Content-Disposition", disposition);
        if let Some(cid) = &self.content_id {
            headers.add("Content-ID", format!("<{}>", cid.trim_matches(['<', '>'])));
        }

        Ok((headers, encode_base64_wrapped(&self.content)))
    }
}
