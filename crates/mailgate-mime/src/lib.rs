//! # mailgate-mime
//!
//! MIME composition for outgoing mail.
//!
//! ## Features
//!
//! - **Composition**: build messages with text, HTML and attachments
//! - **Envelope control**: override the SMTP sender independently of `From:`
//! - **Ordered headers**: custom headers are emitted in the order added
//! - **Encoding**: Base64, Quoted-Printable, RFC 2047 header encoding
//!
//! ## Quick Start
//!
//! ```
//! use mailgate_mime::{Compose, ComposedMessage, Mailbox};
//!
//! let mut message = ComposedMessage::new();
//! message.set_from(Mailbox::new("sender@example.com"));
//! message.set_to(vec![Mailbox::new("recipient@example.com")]);
//! message.set_subject("Test Message");
//! message.set_text("Hello, World!");
//! message.add_header("X-Campaign", "welcome");
//!
//! let rendered = message.render()?;
//! assert!(rendered.contains("X-Campaign: welcome\r\n"));
//! assert_eq!(message.envelope().to, vec!["recipient@example.com"]);
//! # Ok::<(), mailgate_mime::Error>(())
//! ```
//!
//! The rendered text is not dot-stuffed. Transports that speak SMTP `DATA`
//! must escape line-leading dots themselves.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod attachment;
mod compose;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use address::{Mailbox, parse_address_list};
pub use attachment::{Attachment, Disposition};
pub use compose::{Compose, ComposedMessage, Envelope};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Part, PartBody, TransferEncoding, new_boundary};
