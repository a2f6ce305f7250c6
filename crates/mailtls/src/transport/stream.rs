//! Low-level SMTP stream handling.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::{Connector, Transport};
use crate::command::Command;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::Reply;

/// Longest reply line accepted, CRLF included.
const MAX_REPLY_LINE: u64 = 4096;

/// Most lines accepted in one multi-line reply.
const MAX_REPLY_LINES: usize = 512;

/// SMTP stream (plaintext or TLS).
#[derive(Debug)]
pub enum SmtpStream<S> {
    /// Plaintext connection, before STARTTLS.
    Plain(BufReader<S>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<TlsStream<S>>>),
}

impl<S> SmtpStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Reads one reply line, without its line ending.
    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = match self {
            Self::Plain(reader) => read_bounded_line(reader, &mut line).await?,
            Self::Tls(reader) => read_bounded_line(&mut **reader, &mut line).await?,
        };

        if read == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )));
        }
        if !line.ends_with('\n') {
            return Err(Error::Protocol(format!(
                "Unterminated or oversized reply line ({read} bytes)"
            )));
        }

        Ok(line.trim_end().to_string())
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Self::Plain(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await
            }
            Self::Tls(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await
            }
        }
    }
}

async fn read_bounded_line<R>(reader: &mut R, line: &mut String) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    reader.take(MAX_REPLY_LINE).read_line(line).await
}

/// [`Transport`] over any byte stream, upgraded in place with rustls.
#[derive(Debug)]
pub struct SmtpTransport<S> {
    // `None` once a failed upgrade has consumed the stream.
    stream: Option<SmtpStream<S>>,
    tls: Arc<ClientConfig>,
    io_timeout: Duration,
    at_line_start: bool,
    last_byte: Option<u8>,
}

impl<S> SmtpTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps a freshly connected plaintext stream.
    #[must_use]
    pub fn new(stream: S, tls: Arc<ClientConfig>, io_timeout: Duration) -> Self {
        Self {
            stream: Some(SmtpStream::Plain(BufReader::new(stream))),
            tls,
            io_timeout,
            at_line_start: true,
            last_byte: None,
        }
    }

    fn stream(&mut self) -> Result<&mut SmtpStream<S>> {
        self.stream
            .as_mut()
            .ok_or_else(|| Error::InvalidState("connection closed after failed TLS upgrade".into()))
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        let io_timeout = self.io_timeout;
        let stream = self.stream()?;

        let mut lines = Vec::new();
        loop {
            let line = timeout(io_timeout, stream.read_line())
                .await
                .map_err(|_| Error::Timeout(io_timeout))??;
            if line.is_empty() {
                continue;
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                break;
            }
            if lines.len() >= MAX_REPLY_LINES {
                return Err(Error::Protocol(format!(
                    "Reply exceeds {MAX_REPLY_LINES} lines"
                )));
            }
        }

        let reply = parse_reply(&lines)?;
        tracing::trace!(code = reply.code.as_u16(), "S: reply");
        Ok(reply)
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let io_timeout = self.io_timeout;
        let stream = self.stream()?;
        timeout(io_timeout, stream.write_all(data))
            .await
            .map_err(|_| Error::Timeout(io_timeout))??;
        Ok(())
    }
}

impl<S> Transport for SmtpTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn greeting(&mut self) -> Result<Reply> {
        self.read_reply().await
    }

    async fn command(&mut self, command: &Command) -> Result<Reply> {
        tracing::trace!(command = command.verb(), "C: command");
        self.write(&command.serialize()).await?;
        self.read_reply().await
    }

    async fn upgrade_to_tls(&mut self, server_name: &str) -> Result<()> {
        let plain = match self.stream.take() {
            Some(SmtpStream::Plain(reader)) => reader,
            Some(tls @ SmtpStream::Tls(_)) => {
                self.stream = Some(tls);
                return Err(Error::InvalidState("Already using TLS".into()));
            }
            None => return Err(Error::InvalidState("connection closed".into())),
        };

        // Anything already buffered arrived in plaintext and must not be
        // treated as part of the encrypted session.
        if !plain.buffer().is_empty() {
            return Err(Error::Protocol(
                "Server sent data after the STARTTLS reply".into(),
            ));
        }

        let server_name = ServerName::try_from(server_name.to_string())?;
        let connector = TlsConnector::from(Arc::clone(&self.tls));
        let io_timeout = self.io_timeout;
        let tls = timeout(io_timeout, connector.connect(server_name, plain.into_inner()))
            .await
            .map_err(|_| Error::Timeout(io_timeout))?
            .map_err(Error::from_tls_io)?;

        self.stream = Some(SmtpStream::Tls(Box::new(BufReader::new(tls))));
        Ok(())
    }

    fn is_encrypted(&self) -> bool {
        self.stream.as_ref().is_some_and(SmtpStream::is_tls)
    }

    async fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let Some(&last) = data.last() else {
            return Ok(());
        };
        self.write(data).await?;

        self.at_line_start = match data {
            [.., b'\r', b'\n'] => true,
            [b'\n'] => self.last_byte == Some(b'\r'),
            _ => false,
        };
        self.last_byte = Some(last);
        Ok(())
    }

    async fn finish_data(&mut self) -> Result<Reply> {
        if self.at_line_start {
            self.write(b".\r\n").await?;
        } else {
            self.write(b"\r\n.\r\n").await?;
        }
        self.at_line_start = true;
        self.last_byte = None;
        self.read_reply().await
    }
}

/// Dials plain TCP; the session upgrades with STARTTLS.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    tls: Arc<ClientConfig>,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl TcpConnector {
    /// Creates a connector using the timeouts and TLS settings of `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            tls: config.tls.clone().unwrap_or_else(default_tls_config),
            connect_timeout: config.connect_timeout,
            io_timeout: config.io_timeout,
        }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Connector for TcpConnector {
    type Transport = SmtpTransport<TcpStream>;

    async fn connect(&self, target: &str) -> Result<Self::Transport> {
        let tcp = timeout(self.connect_timeout, TcpStream::connect(target))
            .await
            .map_err(|_| Error::Timeout(self.connect_timeout))??;
        Ok(SmtpTransport::new(tcp, Arc::clone(&self.tls), self.io_timeout))
    }
}

/// Creates a TLS client configuration trusting the webpki root certificates.
#[must_use]
pub fn default_tls_config() -> Arc<ClientConfig> {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::types::{Address, ReplyCode};
    use tokio_test::io::{Builder, Mock};

    fn transport(mock: Mock) -> SmtpTransport<Mock> {
        SmtpTransport::new(mock, default_tls_config(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_greeting_and_command() {
        let mock = Builder::new()
            .read(b"220 smtp.example.com ESMTP\r\n")
            .write(b"MAIL FROM:<b@x.com>\r\n")
            .read(b"250 2.1.0 Ok\r\n")
            .build();
        let mut transport = transport(mock);

        let greeting = transport.greeting().await.unwrap();
        assert_eq!(greeting.code, ReplyCode::SERVICE_READY);

        let cmd = Command::MailFrom {
            from: Address::new("b@x.com").unwrap(),
        };
        let reply = transport.command(&cmd).await.unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert!(!transport.is_encrypted());
    }

    #[tokio::test]
    async fn test_multi_line_reply() {
        let mock = Builder::new()
            .write(b"EHLO localhost\r\n")
            .read(b"250-smtp.example.com\r\n250-STARTTLS\r\n")
            .read(b"250 AUTH PLAIN\r\n")
            .build();
        let mut transport = transport(mock);

        let reply = transport
            .command(&Command::Ehlo {
                hostname: "localhost".into(),
            })
            .await
            .unwrap();
        assert_eq!(reply.message, vec!["smtp.example.com", "STARTTLS", "AUTH PLAIN"]);
    }

    #[tokio::test]
    async fn test_finish_data_after_complete_line() {
        let mock = Builder::new()
            .write(b"Hello\r\n")
            .write(b".\r\n")
            .read(b"250 queued\r\n")
            .build();
        let mut transport = transport(mock);

        transport.write_data(b"Hello\r\n").await.unwrap();
        let reply = transport.finish_data().await.unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
    }

    #[tokio::test]
    async fn test_finish_data_terminates_open_line() {
        let mock = Builder::new()
            .write(b"no newline")
            .write(b"\r\n.\r\n")
            .read(b"250 queued\r\n")
            .build();
        let mut transport = transport(mock);

        transport.write_data(b"no newline").await.unwrap();
        transport.finish_data().await.unwrap();
    }

    #[tokio::test]
    async fn test_crlf_split_across_writes() {
        let mock = Builder::new()
            .write(b"line\r")
            .write(b"\n")
            .write(b".\r\n")
            .read(b"250 queued\r\n")
            .build();
        let mut transport = transport(mock);

        transport.write_data(b"line\r").await.unwrap();
        transport.write_data(b"\n").await.unwrap();
        transport.finish_data().await.unwrap();
    }

    #[tokio::test]
    async fn test_body_is_not_dot_stuffed() {
        let mock = Builder::new()
            .write(b".leading dot\r\n")
            .write(b".\r\n")
            .read(b"250 queued\r\n")
            .build();
        let mut transport = transport(mock);

        transport.write_data(b".leading dot\r\n").await.unwrap();
        transport.finish_data().await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_closed() {
        let mut transport = transport(Builder::new().build());
        let err = transport.greeting().await.unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn test_unterminated_reply() {
        let mut transport = transport(Builder::new().read(b"220 half a line").build());
        let err = transport.greeting().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_reply_at_line_limit() {
        let mut data = "250-ext\r\n".repeat(MAX_REPLY_LINES - 1);
        data.push_str("250 done\r\n");
        let mut transport = transport(Builder::new().read(data.as_bytes()).build());

        let reply = transport.greeting().await.unwrap();
        assert_eq!(reply.message.len(), MAX_REPLY_LINES);
    }

    #[tokio::test]
    async fn test_endless_continuation_lines_are_rejected() {
        let data = "250-ext\r\n".repeat(MAX_REPLY_LINES);
        let mut transport = transport(Builder::new().read(data.as_bytes()).build());

        let err = transport.greeting().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(msg) if msg.contains("512")));
    }

    #[tokio::test]
    async fn test_data_pipelined_after_starttls_is_rejected() {
        let mock = Builder::new()
            .write(b"STARTTLS\r\n")
            .read(b"220 go ahead\r\n250 injected\r\n")
            .build();
        let mut transport = transport(mock);

        let reply = transport.command(&Command::StartTls).await.unwrap();
        assert_eq!(reply.code, ReplyCode::SERVICE_READY);

        let err = transport.upgrade_to_tls("smtp.example.com").await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(!transport.is_encrypted());

        // The stream is gone; nothing more can be sent.
        let err = transport.command(&Command::Quit).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout() {
        let (client, _server) = tokio::io::duplex(1024);
        let mut transport =
            SmtpTransport::new(client, default_tls_config(), Duration::from_secs(60));

        let err = transport.greeting().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(60)));
    }

    #[test]
    fn test_default_tls_config() {
        let config = default_tls_config();
        assert!(Arc::strong_count(&config) >= 1);
    }
}
