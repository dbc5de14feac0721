//! Turns a [`MailRequest`] into a composed message.

use mailgate_mime::{Compose, ComposedMessage, Mailbox};

use crate::error::{Error, Result};
use crate::request::MailRequest;

/// Builds the message for `request`.
///
/// Headers and attachments keep the caller's order. `envelope_from` replaces
/// the envelope sender only; the `From:` header keeps `from`.
///
/// # Errors
///
/// Returns an error if an address does not parse.
pub fn compose(request: &MailRequest) -> Result<ComposedMessage> {
    let mut message = ComposedMessage::new();

    message.set_from(Mailbox::parse(&request.from)?);
    message.set_to(request.to.mailboxes()?);
    message.set_cc(request.cc.mailboxes()?);
    message.set_bcc(request.bcc.mailboxes()?);
    message.set_reply_to(request.reply_to.mailboxes()?);

    if let Some(subject) = &request.subject {
        message.set_subject(subject.clone());
    }
    if let Some(text) = &request.text {
        message.set_text(text.clone());
    }
    if let Some(html) = &request.html {
        message.set_html(html.clone());
    }

    for (name, value) in &request.headers {
        message.add_header(name, value);
    }
    for attachment in &request.attachments {
        message.add_attachment(attachment.clone());
    }

    if let Some(envelope_from) = &request.envelope_from {
        let sender = Mailbox::parse(envelope_from)?;
        let mut envelope = message.envelope();
        envelope.from = Some(sender.address);
        message.set_envelope(envelope);
    }

    if message.envelope().to.is_empty() {
        return Err(Error::Validation("no recipients".into()));
    }

    Ok(message)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailgate_mime::Attachment;

    fn header_block(rendered: &str) -> String {
        rendered.split("\r\n\r\n").next().unwrap().to_string()
    }

    #[test]
    fn test_maps_fields() {
        let request = MailRequest::new("App <app@example.com>", "a@example.com, b@example.com", "Hi")
            .cc("c@example.com")
            .bcc("d@example.com")
            .reply_to("support@example.com")
            .text("Body");
        let message = compose(&request).unwrap();

        let envelope = message.envelope();
        assert_eq!(envelope.from.as_deref(), Some("app@example.com"));
        assert_eq!(
            envelope.to,
            vec!["a@example.com", "b@example.com", "c@example.com", "d@example.com"]
        );

        let headers = header_block(&message.render().unwrap());
        assert!(headers.contains("From: App <app@example.com>\r\n"));
        assert!(headers.contains("To: a@example.com, b@example.com\r\n"));
        assert!(headers.contains("Cc: c@example.com\r\n"));
        assert!(headers.contains("Reply-To: support@example.com\r\n"));
        assert!(!headers.contains("d@example.com"));
    }

    #[test]
    fn test_envelope_from_overrides_sender_only() {
        let request = MailRequest::new("app@example.com", "a@example.com", "Hi")
            .envelope_from("bounces+42@example.com");
        let message = compose(&request).unwrap();

        assert_eq!(
            message.envelope().from.as_deref(),
            Some("bounces+42@example.com")
        );
        assert_eq!(message.envelope().to, vec!["a@example.com"]);
        let rendered = message.render().unwrap();
        assert!(rendered.contains("From: app@example.com\r\n"));
        assert!(!rendered.contains("bounces+42"));
    }

    #[test]
    fn test_headers_and_attachments_keep_order() {
        let request = MailRequest::new("app@example.com", "a@example.com", "Hi")
            .header("X-Tag", "first")
            .header("X-Other", "middle")
            .header("X-Tag", "second")
            .attachment(Attachment::new(b"1".to_vec()).with_filename("one.txt"))
            .attachment(Attachment::new(b"2".to_vec()).with_filename("two.txt"));
        let message = compose(&request).unwrap();

        assert_eq!(message.headers().get_all("X-Tag"), vec!["first", "second"]);
        let rendered = message.render().unwrap();
        let first = rendered.find("X-Tag: first").unwrap();
        let middle = rendered.find("X-Other: middle").unwrap();
        let second = rendered.find("X-Tag: second").unwrap();
        assert!(first < middle && middle < second);
        assert!(rendered.find("one.txt").unwrap() < rendered.find("two.txt").unwrap());
    }

    #[test]
    fn test_malformed_address_fails() {
        let request = MailRequest::new("app@example.com", "Name <broken", "Hi");
        assert!(compose(&request).unwrap_err().is_validation());
    }
}
