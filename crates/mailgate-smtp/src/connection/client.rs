//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::trace;

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = Self::read_reply(&mut stream).await?;
        if !greeting.is_success() {
            return Err(greeting.into_error());
        }

        // First word of the greeting is the server's name
        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            _state: PhantomData,
        })
    }

    /// Greets with EHLO, falling back to HELO when the server does not
    /// understand it (RFC 5321 §4.1.4). A HELO session has no extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if both greetings fail.
    pub async fn greet(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;

        if reply.is_success() {
            self.server_info.extensions = parse_extensions(&reply);
            return Ok(self);
        }

        if reply.code != ReplyCode::SYNTAX_ERROR && reply.code != ReplyCode::NOT_IMPLEMENTED {
            return Err(reply.into_error());
        }

        self.expect_success(Command::Helo {
            hostname: client_hostname.to_string(),
        })
        .await?;
        self.server_info.extensions.clear();
        Ok(self)
    }

    /// Upgrades the connection to TLS using STARTTLS. `server_name` is
    /// verified against the certificate; `client_hostname` is re-announced
    /// in the EHLO that follows.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not supported or if the upgrade fails.
    pub async fn starttls(mut self, server_name: &str, client_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.expect_success(Command::StartTls).await?;
        self.stream = self.stream.upgrade_to_tls(server_name).await?;

        // Capabilities must be rediscovered over the encrypted channel
        let reply = self
            .expect_success(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;
        self.server_info.extensions = parse_extensions(&reply);

        Ok(self)
    }

    /// Authenticates with the strongest mechanism both sides share: PLAIN,
    /// then LOGIN. A server that advertises no AUTH extension is tried with PLAIN.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn authenticate(
        self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let offered = self.server_info.auth_mechanisms();
        if offered.is_empty() || offered.contains(&AuthMechanism::Plain) {
            self.auth_plain(username, password).await
        } else if offered.contains(&AuthMechanism::Login) {
            self.auth_login(username, password).await
        } else {
            Err(Error::NotSupported("PLAIN or LOGIN authentication".into()))
        }
    }

    /// Authenticates using PLAIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        // \0username\0password
        let credentials = format!("\0{username}\0{password}");
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(STANDARD.encode(credentials.as_bytes())),
        };

        self.expect_success(cmd).await?;
        Ok(self.transition())
    }

    /// Authenticates using LOGIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not challenge as expected or
    /// rejects the credentials.
    pub async fn auth_login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        self.expect_code(cmd, ReplyCode::AUTH_CONTINUE).await?;
        self.expect_code(
            Command::AuthResponse(STANDARD.encode(username)),
            ReplyCode::AUTH_CONTINUE,
        )
        .await?;
        self.expect_success(Command::AuthResponse(STANDARD.encode(password)))
            .await?;
        Ok(self.transition())
    }

    /// Starts a mail transaction without authentication (if server allows).
    ///
    /// `size` is announced with the SIZE parameter when the server supports it.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(
        self,
        from: Address,
        size: Option<usize>,
    ) -> Result<Client<MailTransaction>> {
        self.start_transaction(from, size).await
    }
}

impl Client<Authenticated> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(
        self,
        from: Address,
        size: Option<usize>,
    ) -> Result<Client<MailTransaction>> {
        self.start_transaction(from, size).await
    }

    /// Forgets the authentication marker. The server-side session stays
    /// authenticated, so later transactions need no new AUTH.
    #[must_use]
    pub fn into_connected(self) -> Client<Connected> {
        self.transition()
    }
}

impl Client<MailTransaction> {
    /// Adds a recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded>> {
        self.expect_success(Command::RcptTo { to }).await?;
        Ok(self.transition())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        self.expect_success(Command::RcptTo { to }).await?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command fails.
    pub async fn data(mut self) -> Result<Client<Data>> {
        self.expect_code(Command::Data, ReplyCode::START_DATA).await?;
        Ok(self.transition())
    }
}

impl Client<Data> {
    /// Sends the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF and the terminating `.` line is
    /// appended. The payload must already be dot-stuffed: lines are written
    /// as given.
    ///
    /// # Errors
    ///
    /// Returns an error if sending the message fails or server rejects it.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Connected>> {
        let mut payload = Vec::with_capacity(message.len() + 64);
        let body = message.strip_suffix(b"\n").unwrap_or(message);
        for line in body.split(|&b| b == b'\n') {
            payload.extend_from_slice(line.strip_suffix(b"\r").unwrap_or(line));
            payload.extend_from_slice(b"\r\n");
        }
        payload.extend_from_slice(b".\r\n");

        self.stream.write_all(&payload).await?;
        self.stream.flush().await?;
        trace!(bytes = payload.len(), "C: <message data>");

        let reply = Self::read_reply(&mut self.stream).await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }

        Ok(self.transition())
    }
}

// Common implementation for all states
impl<S> Client<S> {
    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    async fn start_transaction(
        mut self,
        from: Address,
        size: Option<usize>,
    ) -> Result<Client<MailTransaction>> {
        let size = size.filter(|_| self.server_info.supports_size());
        self.expect_success(Command::MailFrom { from, size }).await?;
        Ok(self.transition())
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        trace!("C: {cmd:?}");
        self.stream.write_all(&cmd.serialize()).await?;
        self.stream.flush().await?;
        let reply = Self::read_reply(&mut self.stream).await?;
        trace!("S: {} {}", reply.code, reply.message_text());
        Ok(reply)
    }

    async fn expect_success(&mut self, cmd: Command) -> Result<Reply> {
        let reply = self.send_command(cmd).await?;
        if reply.is_success() {
            Ok(reply)
        } else {
            Err(reply.into_error())
        }
    }

    async fn expect_code(&mut self, cmd: Command, code: ReplyCode) -> Result<Reply> {
        let reply = self.send_command(cmd).await?;
        if reply.code == code {
            Ok(reply)
        } else {
            Err(reply.into_error())
        }
    }

    async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = stream.read_line().await?;
            if line.is_empty() {
                continue;
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                break;
            }
        }

        parse_reply(&lines)
    }

    /// Sends NOOP to check that the session is still alive.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is gone or the server refuses.
    pub async fn noop(&mut self) -> Result<()> {
        self.expect_success(Command::Noop).await.map(|_| ())
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;

        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(reply.into_error());
        }

        Ok(())
    }
}

fn parse_extensions(ehlo_reply: &Reply) -> HashSet<Extension> {
    // First line is the greeting, the rest are keywords
    ehlo_reply
        .message
        .iter()
        .skip(1)
        .map(|line| Extension::parse(line))
        .collect()
}
