//! Sessions over real sockets against servers that do not complete TLS.
//!
//! Nothing after a failed or refused STARTTLS may reach the server in
//! plaintext, so each test asserts the exact lines the server received.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use mailtls::{Config, Email, Error, Mailer, Server, Stage};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Reply behaviour of the fake server.
#[derive(Debug, Clone, Copy)]
struct FakeServer {
    greeting: &'static str,
    ehlo: &'static str,
    starttls: &'static str,
    /// Close the connection right after answering STARTTLS.
    hang_up_after_starttls: bool,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self {
            greeting: "220 fake.example.com ESMTP\r\n",
            ehlo: "250-fake.example.com\r\n250-PIPELINING\r\n250 STARTTLS\r\n",
            starttls: "220 go ahead\r\n",
            hang_up_after_starttls: true,
        }
    }
}

impl FakeServer {
    /// Accepts one connection and returns every line the client sent.
    async fn spawn(self) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = socket.into_split();
            let mut lines = BufReader::new(reader).lines();
            let mut received = Vec::new();

            writer.write_all(self.greeting.as_bytes()).await.unwrap();
            if !self.greeting.starts_with("220") {
                return received;
            }

            while let Ok(Some(line)) = lines.next_line().await {
                let reply = if line.starts_with("EHLO") {
                    self.ehlo
                } else if line == "STARTTLS" {
                    self.starttls
                } else {
                    "502 unexpected command\r\n"
                };
                received.push(line.clone());
                if writer.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
                if line == "STARTTLS" && self.hang_up_after_starttls {
                    break;
                }
            }
            received
        });

        (address, handle)
    }
}

fn mailer() -> Mailer {
    let config = Config::builder()
        .connect_timeout(Duration::from_secs(5))
        .io_timeout(Duration::from_secs(5))
        .build();
    Mailer::new(config)
}

fn email() -> Email {
    Email::new("a@x.com", "b@x.com", "Hi", "Hello.\r\n")
}

#[tokio::test]
async fn test_server_without_starttls() {
    let (address, server) = FakeServer {
        ehlo: "250-fake.example.com\r\n250 AUTH PLAIN\r\n",
        ..FakeServer::default()
    }
    .spawn()
    .await;

    let err = mailer()
        .send(&Server::new(address, "user", "pass"), email())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::StartTls);
    assert!(matches!(err.error(), Error::NotSupported(_)));
    assert_eq!(server.await.unwrap(), vec!["EHLO localhost"]);
}

#[tokio::test]
async fn test_server_refuses_starttls() {
    let (address, server) = FakeServer {
        starttls: "454 TLS not available\r\n",
        hang_up_after_starttls: false,
        ..FakeServer::default()
    }
    .spawn()
    .await;

    let err = mailer()
        .send(&Server::new(address, "user", "pass"), email())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::StartTls);
    assert!(err.error().is_transient());
    assert_eq!(server.await.unwrap(), vec!["EHLO localhost", "STARTTLS"]);
}

#[tokio::test]
async fn test_handshake_failure_sends_nothing_more() {
    let (address, server) = FakeServer::default().spawn().await;

    let err = mailer()
        .send(&Server::new(address, "user", "pass"), email())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::StartTls);
    assert!(matches!(err.error(), Error::Io(_) | Error::Tls(_)));
    assert_eq!(server.await.unwrap(), vec!["EHLO localhost", "STARTTLS"]);
}

#[tokio::test]
async fn test_greeting_refused() {
    let (address, server) = FakeServer {
        greeting: "554 no service\r\n",
        ..FakeServer::default()
    }
    .spawn()
    .await;

    let err = mailer()
        .send(&Server::new(address, "user", "pass"), email())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Connect);
    assert!(matches!(err.error(), Error::SmtpError { code: 554, .. }));
    assert!(server.await.unwrap().is_empty());
}
