//! Integration tests for the SMTP client.
//!
//! Each test starts a scripted server on a loopback port: it answers every
//! client line with the next canned reply and records what it received.

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use mailgate_smtp::connection::connect;
use mailgate_smtp::{Address, Client, Error, SmtpConnection};
use tokio_test::{assert_err, assert_ok};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Starts a server that sends `greeting`, then answers each line with the
/// next reply. Lines after DATA are collected until the `.` terminator.
/// Resolves to every line the client sent.
async fn scripted(
    greeting: &'static str,
    replies: Vec<&'static str>,
) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();
        let mut received = Vec::new();

        write.write_all(greeting.as_bytes()).await.unwrap();
        let mut replies = replies.into_iter();
        let mut in_data = false;

        while let Ok(Some(line)) = lines.next_line().await {
            received.push(line.clone());
            if in_data && line != "." {
                continue;
            }
            in_data = false;
            let Some(reply) = replies.next() else { break };
            if reply.starts_with("354") {
                in_data = true;
            }
            write.write_all(reply.as_bytes()).await.unwrap();
        }
        received
    });

    (port, handle)
}

#[tokio::test]
async fn test_transaction_writes_payload_verbatim() {
    init_tracing();
    let (port, server) = scripted(
        "220 mx.test ESMTP\r\n",
        vec![
            "250-mx.test\r\n250-SIZE 1000\r\n250 8BITMIME\r\n",
            "250 OK\r\n",
            "250 OK\r\n",
            "354 Go ahead\r\n",
            "250 Queued\r\n",
            "221 Bye\r\n",
        ],
    )
    .await;

    let client = Client::from_stream(connect("127.0.0.1", port).await.unwrap())
        .await
        .unwrap();
    assert_eq!(client.server_info().hostname, "mx.test");

    let client = client.greet("client.test").await.unwrap();
    assert_eq!(client.server_info().max_message_size(), Some(1000));

    let payload = b"Subject: Hi\n\n..already stuffed\r\nend\n";
    let client = client
        .mail_from(Address::new("a@example.com").unwrap(), Some(payload.len()))
        .await
        .unwrap()
        .rcpt_to(Address::new("b@example.com").unwrap())
        .await
        .unwrap()
        .data()
        .await
        .unwrap()
        .send_message(payload)
        .await
        .unwrap();
    client.quit().await.unwrap();

    let received = server.await.unwrap();
    assert_eq!(
        received,
        vec![
            "EHLO client.test".to_string(),
            format!("MAIL FROM:<a@example.com> SIZE={}", payload.len()),
            "RCPT TO:<b@example.com>".to_string(),
            "DATA".to_string(),
            "Subject: Hi".to_string(),
            String::new(),
            "..already stuffed".to_string(),
            "end".to_string(),
            ".".to_string(),
            "QUIT".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_greet_falls_back_to_helo() {
    let (port, server) = scripted(
        "220 old.test\r\n",
        vec!["502 Command not implemented\r\n", "250 old.test\r\n", "250 OK\r\n"],
    )
    .await;

    let mut client = Client::from_stream(connect("127.0.0.1", port).await.unwrap())
        .await
        .unwrap()
        .greet("client.test")
        .await
        .unwrap();
    assert!(client.server_info().extensions.is_empty());
    assert_ok!(client.noop().await);
    drop(client);

    let received = server.await.unwrap();
    assert_eq!(received, vec!["EHLO client.test", "HELO client.test", "NOOP"]);
}

#[tokio::test]
async fn test_closed_connection_is_reported() {
    let (port, server) = scripted("220 mx.test\r\n", vec![]).await;

    let mut client = Client::from_stream(connect("127.0.0.1", port).await.unwrap())
        .await
        .unwrap();
    let err = assert_err!(client.noop().await);
    assert!(matches!(err, Error::ConnectionClosed));
    assert!(err.is_connection_error());
    server.await.unwrap();
}

#[tokio::test]
async fn test_rejection_carries_reply() {
    let (port, _server) = scripted(
        "220 mx.test\r\n",
        vec!["250 mx.test\r\n", "550 5.7.1 Relaying denied\r\n"],
    )
    .await;

    let client = Client::from_stream(connect("127.0.0.1", port).await.unwrap())
        .await
        .unwrap()
        .greet("client.test")
        .await
        .unwrap();
    let err = client
        .mail_from(Address::new("a@example.com").unwrap(), None)
        .await
        .unwrap_err();

    assert!(err.is_permanent());
    match err {
        Error::SmtpError { code, message } => {
            assert_eq!(code, 550);
            assert!(message.contains("Relaying denied"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
