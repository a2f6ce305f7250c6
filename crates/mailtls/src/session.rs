//! The submission session: one connection, one message.
//!
//! ```text
//! Disconnected ─dial─→ Connected ─STARTTLS─→ Encrypted ─AUTH PLAIN─→ Authenticated
//!      ─MAIL/RCPT─→ EnvelopeSet ─DATA─→ DataPhase ─"."─→ Sent ─QUIT─→ Closed
//! ```
//!
//! Each transition either moves one state forward or ends the session with a
//! [`SendError`]. AUTH is only issued from `Encrypted`, which is only
//! produced by a completed TLS handshake.

use base64::Engine;
use chrono::Local;
use tokio::io::AsyncReadExt;

use crate::command::Command;
use crate::config::Config;
use crate::error::{Error, Result, SendError, Stage};
use crate::message::{Email, Server};
use crate::resolver::Endpoint;
use crate::transport::{Connector, TcpConnector, Transport};
use crate::types::{Address, AuthMechanism, Extensions, ReplyCode};

/// The only authentication mechanism used.
pub const AUTH_MECHANISM: AuthMechanism = AuthMechanism::Plain;

/// Size of the buffer used to copy the body to the connection.
const BODY_CHUNK: usize = 8 * 1024;

/// Sends `email` through `server` with the default configuration.
///
/// # Errors
///
/// Returns the first failure, tagged with the [`Stage`] it happened in.
pub async fn send(server: &Server, email: Email) -> std::result::Result<(), SendError> {
    Mailer::default().send(server, email).await
}

/// Sends mail with a fixed configuration and connector.
#[derive(Debug, Clone)]
pub struct Mailer<C = TcpConnector> {
    config: Config,
    connector: C,
}

impl Mailer {
    /// Creates a mailer that dials over TCP.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let connector = TcpConnector::new(&config);
        Self { config, connector }
    }
}

impl Default for Mailer {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<C: Connector> Mailer<C> {
    /// Creates a mailer with a custom connector.
    #[must_use]
    pub const fn with_connector(config: Config, connector: C) -> Self {
        Self { config, connector }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Delivers one message over a new connection.
    ///
    /// The body is read to the end exactly once. A failure at
    /// [`Stage::Quit`] means the server had already accepted the message.
    ///
    /// # Errors
    ///
    /// Returns the first failure, tagged with the [`Stage`] it happened in.
    pub async fn send(&self, server: &Server, email: Email) -> std::result::Result<(), SendError> {
        let endpoint = Endpoint::resolve_with_port(&server.address, self.config.default_port);
        Session {
            connector: &self.connector,
            config: &self.config,
            server,
            endpoint,
            email,
        }
        .run()
        .await
    }
}

/// Progress of a session. Every variant after `Connected` owns the
/// connection opened in `Disconnected`.
enum State<T> {
    Disconnected,
    Connected(T),
    Encrypted { transport: T, extensions: Extensions },
    Authenticated(T),
    EnvelopeSet(T),
    DataPhase(T),
    Sent(T),
    Closed,
}

struct Session<'a, C> {
    connector: &'a C,
    config: &'a Config,
    server: &'a Server,
    endpoint: Endpoint,
    email: Email,
}

// Steps borrow the session mutably: `Body` is `Send` but not `Sync`, so a
// shared borrow held across an await would make the future `!Send`.
#[allow(clippy::needless_pass_by_ref_mut)]
impl<C: Connector> Session<'_, C> {
    async fn run(mut self) -> std::result::Result<(), SendError> {
        let mut state = State::Disconnected;
        loop {
            state = match self.step(state).await {
                Ok(State::Closed) => {
                    tracing::debug!(server = %self.endpoint, "message sent");
                    return Ok(());
                }
                Ok(next) => next,
                Err(err) => {
                    tracing::warn!(server = %self.endpoint, stage = %err.stage(), "send aborted: {err}");
                    return Err(err);
                }
            };
        }
    }

    /// Moves the session one state forward.
    async fn step(
        &mut self,
        state: State<C::Transport>,
    ) -> std::result::Result<State<C::Transport>, SendError> {
        match state {
            State::Disconnected => self
                .connect()
                .await
                .map(State::Connected)
                .map_err(|e| SendError::new(Stage::Connect, e)),
            State::Connected(transport) => self
                .starttls(transport)
                .await
                .map(|(transport, extensions)| State::Encrypted {
                    transport,
                    extensions,
                })
                .map_err(|e| SendError::new(Stage::StartTls, e)),
            State::Encrypted {
                transport,
                extensions,
            } => self
                .authenticate(transport, &extensions)
                .await
                .map(State::Authenticated)
                .map_err(|e| SendError::new(Stage::Auth, e)),
            State::Authenticated(transport) => {
                self.envelope(transport).await.map(State::EnvelopeSet)
            }
            State::EnvelopeSet(transport) => self
                .write_message(transport)
                .await
                .map(State::DataPhase)
                .map_err(|e| SendError::new(Stage::Data, e)),
            State::DataPhase(transport) => self
                .finish_message(transport)
                .await
                .map(State::Sent)
                .map_err(|e| SendError::new(Stage::Data, e)),
            State::Sent(transport) => self
                .quit(transport)
                .await
                .map(|()| State::Closed)
                .map_err(|e| SendError::new(Stage::Quit, e)),
            State::Closed => Ok(State::Closed),
        }
    }

    async fn connect(&mut self) -> Result<C::Transport> {
        tracing::debug!(server = %self.endpoint, "connecting");
        let mut transport = self.connector.connect(self.endpoint.target()).await?;
        transport
            .greeting()
            .await?
            .expect_code(ReplyCode::SERVICE_READY)?;
        Ok(transport)
    }

    async fn starttls(&mut self, mut transport: C::Transport) -> Result<(C::Transport, Extensions)> {
        let ehlo = Command::Ehlo {
            hostname: self.config.client_hostname.clone(),
        };

        let reply = transport.command(&ehlo).await?.expect_success()?;
        if !Extensions::from_ehlo(&reply.message).supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        transport
            .command(&Command::StartTls)
            .await?
            .expect_code(ReplyCode::SERVICE_READY)?;

        tracing::debug!(server_name = self.endpoint.tls_server_name(), "starting TLS");
        transport
            .upgrade_to_tls(self.endpoint.tls_server_name())
            .await?;

        // Capabilities learned before the handshake are discarded
        let reply = transport.command(&ehlo).await?.expect_success()?;
        Ok((transport, Extensions::from_ehlo(&reply.message)))
    }

    async fn authenticate(
        &mut self,
        mut transport: C::Transport,
        extensions: &Extensions,
    ) -> Result<C::Transport> {
        if !transport.is_encrypted() {
            return Err(Error::InvalidState(
                "refusing to authenticate over an unencrypted connection".into(),
            ));
        }
        if !extensions.supports_auth() {
            return Err(Error::NotSupported("AUTH".into()));
        }

        tracing::debug!(host = self.endpoint.hostname(), user = %self.server.user, "authenticating");
        let cmd = Command::Auth {
            mechanism: AUTH_MECHANISM,
            initial_response: plain_response(&self.server.user, &self.server.password),
        };
        transport
            .command(&cmd)
            .await?
            .expect_code(ReplyCode::AUTH_SUCCESS)?;
        Ok(transport)
    }

    async fn envelope(
        &mut self,
        mut transport: C::Transport,
    ) -> std::result::Result<C::Transport, SendError> {
        let from = &self.email.from;
        let sender = async {
            let from = Address::from_mailbox(from)?;
            transport
                .command(&Command::MailFrom { from })
                .await?
                .expect_success()
        };
        sender
            .await
            .map_err(|e| SendError::with_address(Stage::Sender, from, e))?;

        // Owned so no borrow of `Email` (and its `!Sync` body) spans an await
        let recipients: Vec<String> = self.email.recipients().map(str::to_owned).collect();
        for recipient in &recipients {
            let rcpt = async {
                let to = Address::from_mailbox(recipient)?;
                transport
                    .command(&Command::RcptTo { to })
                    .await?
                    .expect_success()
            };
            rcpt.await
                .map_err(|e| SendError::with_address(Stage::Recipient, recipient, e))?;
        }

        Ok(transport)
    }

    async fn write_message(&mut self, mut transport: C::Transport) -> Result<C::Transport> {
        transport
            .command(&Command::Data)
            .await?
            .expect_code(ReplyCode::START_DATA)?;

        let headers = self.email.header_block(&Local::now());
        transport.write_data(headers.as_bytes()).await?;

        let mut body = std::mem::take(&mut self.email.body);
        let mut chunk = vec![0u8; BODY_CHUNK];
        let mut sent = 0usize;
        loop {
            let read = body.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            transport.write_data(&chunk[..read]).await?;
            sent += read;
        }
        tracing::debug!(body_bytes = sent, "message written");

        Ok(transport)
    }

    async fn finish_message(&mut self, mut transport: C::Transport) -> Result<C::Transport> {
        transport.finish_data().await?.expect_success()?;
        Ok(transport)
    }

    async fn quit(&mut self, mut transport: C::Transport) -> Result<()> {
        transport.command(&Command::Quit).await?.expect_success()?;
        Ok(())
    }
}

/// Builds the PLAIN initial response: empty authorization identity, then
/// user and password, NUL-separated and base64-encoded.
fn plain_response(user: &str, password: &str) -> String {
    let credentials = format!("\0{user}\0{password}");
    base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes())
}
