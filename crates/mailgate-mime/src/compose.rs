//! Outgoing message composition.
//!
//! [`Compose`] is the capability a dispatcher needs from a MIME encoder:
//! read and override the envelope, append headers and attachments, and
//! render the wire text. [`ComposedMessage`] is the bundled implementation.

use crate::address::Mailbox;
use crate::attachment::Attachment;
use crate::content_type::ContentType;
use crate::encoding::encode_rfc2047;
use crate::error::Result;
use crate::header::Headers;
use crate::message::Part;
use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;

/// SMTP-level sender and recipients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Reverse-path (bounce address).
    pub from: Option<String>,
    /// Forward-paths: every To, Cc and Bcc address, without duplicates.
    pub to: Vec<String>,
}

/// Capability interface over a MIME encoder.
pub trait Compose {
    /// Returns the envelope the message will be sent with.
    fn envelope(&self) -> Envelope;

    /// Replaces the envelope, independently of the `From:`/`To:` headers.
    fn set_envelope(&mut self, envelope: Envelope);

    /// Appends a header after any added before it.
    fn add_header(&mut self, name: &str, value: &str);

    /// Appends an attachment after any added before it.
    fn add_attachment(&mut self, attachment: Attachment);

    /// Renders the full message (headers and body) with CRLF line endings.
    ///
    /// # Errors
    ///
    /// Returns an error if a header or attachment cannot be encoded.
    fn render(&self) -> Result<String>;
}

/// A message being composed for sending.
#[derive(Debug, Clone, Default)]
pub struct ComposedMessage {
    from: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    reply_to: Vec<Mailbox>,
    subject: Option<String>,
    text: Option<String>,
    html: Option<String>,
    headers: Headers,
    attachments: Vec<Attachment>,
    envelope: Option<Envelope>,
}

impl ComposedMessage {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `From:` mailbox.
    pub fn set_from(&mut self, from: Mailbox) {
        self.from = Some(from);
    }

    /// Sets the `To:` mailboxes.
    pub fn set_to(&mut self, to: Vec<Mailbox>) {
        self.to = to;
    }

    /// Sets the `Cc:` mailboxes.
    pub fn set_cc(&mut self, cc: Vec<Mailbox>) {
        self.cc = cc;
    }

    /// Sets the blind-copy mailboxes. They reach the envelope only.
    pub fn set_bcc(&mut self, bcc: Vec<Mailbox>) {
        self.bcc = bcc;
    }

    /// Sets the `Reply-To:` mailboxes.
    pub fn set_reply_to(&mut self, reply_to: Vec<Mailbox>) {
        self.reply_to = reply_to;
    }

    /// Sets the subject.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = Some(subject.into());
    }

    /// Sets the plain-text body.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Sets the HTML body.
    pub fn set_html(&mut self, html: impl Into<String>) {
        self.html = Some(html.into());
    }

    /// Custom headers added so far.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Attachments added so far.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    fn derived_envelope(&self) -> Envelope {
        let mut to: Vec<String> = Vec::new();
        for mailbox in self.to.iter().chain(&self.cc).chain(&self.bcc) {
            if !to.iter().any(|seen| seen.eq_ignore_ascii_case(&mailbox.address)) {
                to.push(mailbox.address.clone());
            }
        }
        Envelope {
            from: self.from.as_ref().map(|m| m.address.clone()),
            to,
        }
    }

    fn body_part(&self) -> Part {
        let text = self
            .text
            .as_deref()
            .map(|text| Part::text(&ContentType::text_plain(), text));
        let html = self
            .html
            .as_deref()
            .map(|html| Part::text(&ContentType::text_html(), html));

        match (text, html) {
            (Some(text), Some(html)) => {
                Part::multipart(ContentType::multipart_alternative, vec![text, html])
            }
            (Some(only), None) | (None, Some(only)) => only,
            (None, None) => Part::text(&ContentType::text_plain(), ""),
        }
    }

    fn message_headers(&self) -> Headers {
        let mut headers = Headers::new();

        if let Some(from) = &self.from {
            headers.add("From", from.to_header_value());
        }
        for (name, list) in [("To", &self.to), ("Cc", &self.cc), ("Reply-To", &self.reply_to)] {
            if !list.is_empty() {
                let joined: Vec<String> = list.iter().map(Mailbox::to_header_value).collect();
                headers.add(name, joined.join(", "));
            }
        }
        if let Some(subject) = &self.subject {
            headers.add("Subject", encode_rfc2047(subject, "utf-8"));
        }

        for (name, value) in self.headers.iter() {
            if is_part_header(name) {
                continue;
            }
            // Values with line breaks stay raw so rendering rejects them
            if value.is_ascii() || value.contains(['\r', '\n']) {
                headers.add(name, value);
            } else {
                headers.add(name, encode_rfc2047(value, "utf-8"));
            }
        }

        if !self.headers.contains("Date") {
            headers.add("Date", Utc::now().to_rfc2822());
        }
        if !self.headers.contains("Message-ID") {
            headers.add("Message-ID", self.new_message_id());
        }
        if !self.headers.contains("MIME-Version") {
            headers.add("MIME-Version", "1.0");
        }

        headers
    }

    fn new_message_id(&self) -> String {
        let domain = self
            .from
            .as_ref()
            .and_then(|m| m.address.rsplit_once('@'))
            .map_or("localhost", |(_, domain)| domain);
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(20)
            .map(char::from)
            .collect();
        format!("<{token}.{}@{domain}>", Utc::now().timestamp_millis())
    }
}

/// Headers that describe the body; the rendered part supplies its own.
fn is_part_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("Content-Type")
        || name.eq_ignore_ascii_case("Content-Transfer-Encoding")
}

impl Compose for ComposedMessage {
    fn envelope(&self) -> Envelope {
        self.envelope
            .clone()
            .unwrap_or_else(|| self.derived_envelope())
    }

    fn set_envelope(&mut self, envelope: Envelope) {
        self.envelope = Some(envelope);
    }

    fn add_header(&mut self, name: &str, value: &str) {
        self.headers.add(name, value);
    }

    fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    fn render(&self) -> Result<String> {
        let body = self.body_part();

        let root = if self.attachments.is_empty() {
            body
        } else {
            let mut parts = Vec::with_capacity(self.attachments.len() + 1);
            parts.push(body);
            for attachment in &self.attachments {
                let (headers, encoded) = attachment.to_part()?;
                parts.push(Part::encoded(headers, encoded));
            }
            Part::multipart(ContentType::multipart_mixed, parts)
        };

        let mut out = String::new();
        root.write_to(Some(&self.message_headers()), &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn header_block(rendered: &str) -> &str {
        rendered.split("\r\n\r\n").next().unwrap()
    }

    fn simple() -> ComposedMessage {
        let mut message = ComposedMessage::new();
        message.set_from(Mailbox::with_name("Alice", "alice@example.com"));
        message.set_to(vec![Mailbox::new("bob@example.com")]);
        message.set_subject("Hello");
        message.set_text("Hi Bob");
        message
    }

    #[test]
    fn test_envelope_collects_all_recipients_once() {
        let mut message = simple();
        message.set_cc(vec![Mailbox::new("carol@example.com")]);
        message.set_bcc(vec![
            Mailbox::new("dave@example.com"),
            Mailbox::new("BOB@example.com"),
        ]);

        let envelope = message.envelope();
        assert_eq!(envelope.from.as_deref(), Some("alice@example.com"));
        assert_eq!(
            envelope.to,
            vec!["bob@example.com", "carol@example.com", "dave@example.com"]
        );
    }

    #[test]
    fn test_explicit_envelope_overrides_derived() {
        let mut message = simple();
        let mut envelope = message.envelope();
        envelope.from = Some("bounces@example.com".to_string());
        message.set_envelope(envelope);

        assert_eq!(message.envelope().from.as_deref(), Some("bounces@example.com"));
        let rendered = message.render().unwrap();
        assert!(header_block(&rendered).contains("From: Alice <alice@example.com>"));
    }

    #[test]
    fn test_bcc_stays_out_of_headers() {
        let mut message = simple();
        message.set_bcc(vec![Mailbox::new("secret@example.com")]);
        let rendered = message.render().unwrap();
        assert!(!rendered.contains("secret@example.com"));
    }

    #[test]
    fn test_generated_headers_present() {
        let rendered = simple().render().unwrap();
        let headers = header_block(&rendered);
        assert!(headers.starts_with("From: Alice <alice@example.com>\r\nTo: bob@example.com\r\nSubject: Hello\r\n"));
        assert!(headers.contains("\r\nDate: "));
        assert!(headers.contains("\r\nMessage-ID: <"));
        assert!(headers.contains("@example.com>\r\n"));
        assert!(headers.contains("\r\nMIME-Version: 1.0\r\n"));
        assert!(rendered.ends_with("\r\n\r\nHi Bob"));
    }

    #[test]
    fn test_caller_headers_keep_order_and_suppress_defaults() {
        let mut message = simple();
        message.add_header("X-Trace", "1");
        message.add_header("Message-ID", "<fixed@example.com>");
        message.add_header("X-Trace", "2");

        let rendered = message.render().unwrap();
        let headers = header_block(&rendered);
        let first = headers.find("X-Trace: 1").unwrap();
        let id = headers.find("Message-ID: <fixed@example.com>").unwrap();
        let second = headers.find("X-Trace: 2").unwrap();
        assert!(first < id && id < second);
        assert_eq!(headers.matches("Message-ID").count(), 1);
    }

    #[test]
    fn test_text_and_html_become_alternative() {
        let mut message = simple();
        message.set_html("<b>Hi</b>");
        let rendered = message.render().unwrap();
        assert!(rendered.contains("Content-Type: multipart/alternative; boundary="));
        assert!(rendered.contains("Hi Bob"));
        assert!(rendered.contains("<b>Hi</b>"));
    }

    #[test]
    fn test_attachments_wrap_in_mixed_in_order() {
        let mut message = simple();
        message.add_attachment(Attachment::new(b"first".to_vec()).with_filename("a.txt"));
        message.add_attachment(Attachment::new(b"second".to_vec()).with_filename("b.txt"));

        let rendered = message.render().unwrap();
        assert!(header_block(&rendered).contains("Content-Type: multipart/mixed; boundary="));
        let a = rendered.find("filename=\"a.txt\"").unwrap();
        let b = rendered.find("filename=\"b.txt\"").unwrap();
        assert!(a < b);
        assert!(rendered.contains("Zmlyc3Q=")); // "first"
    }

    #[test]
    fn test_non_ascii_subject_is_encoded() {
        let mut message = simple();
        message.set_subject("Grüße");
        let rendered = message.render().unwrap();
        assert!(rendered.contains("Subject: =?utf-8?B?"));
    }

    #[test]
    fn test_non_ascii_custom_header_is_encoded() {
        let mut message = simple();
        message.add_header("X-Greeting", "Grüße");
        message.add_header("X-Plain", "hello");

        let rendered = message.render().unwrap();
        let headers = header_block(&rendered);
        assert!(headers.is_ascii());
        assert!(headers.contains("X-Greeting: =?utf-8?B?R3LDvMOfZQ==?=\r\n"));
        assert!(headers.contains("X-Plain: hello\r\n"));
    }

    #[test]
    fn test_caller_content_headers_are_ignored() {
        let mut message = simple();
        message.add_header("Content-Type", "application/json");
        message.add_header("content-transfer-encoding", "base64");

        let rendered = message.render().unwrap();
        let headers = header_block(&rendered);
        assert_eq!(headers.matches("Content-Type:").count(), 1);
        assert!(headers.contains("Content-Type: text/plain"));
        assert!(!headers.contains("application/json"));
        assert!(!headers.to_ascii_lowercase().contains("content-transfer-encoding: base64"));
    }

    #[test]
    fn test_bad_custom_header_fails_render() {
        let mut message = simple();
        message.add_header("X-Bad", "a\r\nBcc: x@example.com");
        assert!(message.render().is_err());
    }
}
