//! Structured mail requests.

use mailgate_mime::{Attachment, Mailbox, parse_address_list};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One or more addresses. Deserializes from a string or a list of strings;
/// each string may hold a comma-separated list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany", into = "Vec<String>")]
pub struct AddressList(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for AddressList {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(one) => Self(vec![one]),
            OneOrMany::Many(many) => Self(many),
        }
    }
}

impl From<AddressList> for Vec<String> {
    fn from(list: AddressList) -> Self {
        list.0
    }
}

impl AddressList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: impl Into<String>) {
        self.0.push(entry.into());
    }

    /// Returns true when no entry holds an address.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|entry| entry.trim().is_empty())
    }

    /// Raw entries as given.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// Parses every entry into mailboxes.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry is malformed.
    pub fn mailboxes(&self) -> Result<Vec<Mailbox>> {
        let mut mailboxes = Vec::new();
        for entry in &self.0 {
            mailboxes.extend(parse_address_list(entry)?);
        }
        Ok(mailboxes)
    }
}

impl From<&str> for AddressList {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for AddressList {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl<S: Into<String>> FromIterator<S> for AddressList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A message to send.
///
/// ```
/// use mailgate::MailRequest;
///
/// let request: MailRequest = serde_json::from_str(r#"{
///     "from": "App <noreply@example.com>",
///     "to": "a@example.com, b@example.com",
///     "bcc": ["audit@example.com"],
///     "subject": "Welcome",
///     "text": "Hello!",
///     "headers": [["X-Campaign", "welcome"]],
///     "envelopeFrom": "bounces@example.com"
/// }"#)?;
/// assert!(request.validate().is_ok());
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MailRequest {
    /// Sender, optionally with a display name.
    pub from: String,
    /// Primary recipients.
    pub to: AddressList,
    /// Carbon-copy recipients.
    pub cc: AddressList,
    /// Blind-copy recipients. They never appear in the headers.
    pub bcc: AddressList,
    /// Reply-To addresses.
    pub reply_to: AddressList,
    /// Subject line.
    pub subject: Option<String>,
    /// Plain-text body.
    pub text: Option<String>,
    /// HTML body.
    pub html: Option<String>,
    /// Extra headers, emitted in order. Repeated names are all kept.
    pub headers: Vec<(String, String)>,
    /// Attachments, emitted in order.
    pub attachments: Vec<Attachment>,
    /// Envelope sender (bounce address). Defaults to the `from` address.
    pub envelope_from: Option<String>,
    /// Endpoint for this request only. Bypasses the shared pool.
    pub smtp_url: Option<String>,
}

impl MailRequest {
    /// Creates a request with sender, recipient and subject.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        to: impl Into<AddressList>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: Some(subject.into()),
            ..Self::default()
        }
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Adds a Cc recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.cc.push(recipient);
        self
    }

    /// Adds a Bcc recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<String>) -> Self {
        self.bcc.push(recipient);
        self
    }

    /// Adds a Reply-To address.
    #[must_use]
    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to.push(address);
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends an attachment.
    #[must_use]
    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Overrides the envelope sender.
    #[must_use]
    pub fn envelope_from(mut self, address: impl Into<String>) -> Self {
        self.envelope_from = Some(address.into());
        self
    }

    /// Sends through this endpoint instead of the configured one.
    #[must_use]
    pub fn smtp_url(mut self, url: impl Into<String>) -> Self {
        self.smtp_url = Some(url.into());
        self
    }

    /// Checks the request can be turned into a message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `from` is empty or there is no
    /// recipient in to, cc or bcc.
    pub fn validate(&self) -> Result<()> {
        if self.from.trim().is_empty() {
            return Err(Error::Validation("missing sender".into()));
        }
        if self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty() {
            return Err(Error::Validation("no recipients".into()));
        }
        Ok(())
    }
}
