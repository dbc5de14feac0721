//! # mailgate-smtp
//!
//! The SMTP transport used by the `mailgate` dispatcher, implementing the
//! client side of RFC 5321.
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   SMTP state transitions
//! - **Protocol support**: EHLO/HELO, MAIL FROM, RCPT TO, DATA, NOOP,
//!   AUTH, STARTTLS, QUIT
//! - **TLS support**: Both implicit TLS (port 465) and STARTTLS
//! - **Authentication**: PLAIN and LOGIN
//!
//! ## Payload framing
//!
//! [`Client::send_message`] writes the payload verbatim apart from line-ending
//! normalization. It does **not** dot-stuff lines that begin with `.`; the
//! caller is expected to have applied RFC 5321 §4.5.2 transparency already.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailgate_smtp::{Client, Address};
//! use mailgate_smtp::connection::connect;
//!
//! #[tokio::main]
//! async fn main() -> mailgate_smtp::Result<()> {
//!     let stream = connect("smtp.example.com", 587).await?;
//!     let client = Client::from_stream(stream).await?;
//!     let client = client.greet("client.example.com").await?;
//!     let client = client.starttls("smtp.example.com", "client.example.com").await?;
//!     let client = client.auth_plain("user@example.com", "password").await?;
//!
//!     let client = client.mail_from(Address::new("sender@example.com")?, None).await?;
//!     let client = client.rcpt_to(Address::new("recipient@example.com")?).await?;
//!     let client = client.data().await?;
//!     let client = client.send_message(b"Subject: Test\r\n\r\nHello\r\n").await?;
//!
//!     client.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────────┐
//! │  Connected   │ ─── auth_plain() / auth_login() ───→ Authenticated
//! └──────────────┘
//!        │
//!        └─── mail_from() ───→ MailTransaction ───→ RecipientAdded ───→ Data
//!                                                                        │
//!                       Connected ←─────── send_message() ───────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, ServerInfo,
    SmtpConnection, SmtpStream,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, EnhancedStatus, Extension, Reply, ReplyCode};
