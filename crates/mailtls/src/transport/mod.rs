//! Transport capability used by the session driver.
//!
//! The driver only speaks to the network through these traits:
//! - [`Connector`] dials a `host:port` target
//! - [`Transport`] exchanges commands and replies, upgrades to TLS and
//!   carries the DATA payload
//!
//! [`TcpConnector`] is the default implementation (tokio + rustls). Tests
//! drive the session against scripted fakes instead.

mod stream;

use std::future::Future;

pub use stream::{SmtpStream, SmtpTransport, TcpConnector, default_tls_config};

use crate::command::Command;
use crate::error::Result;
use crate::types::Reply;

/// An open SMTP connection.
pub trait Transport: Send {
    /// Reads the server greeting.
    fn greeting(&mut self) -> impl Future<Output = Result<Reply>> + Send;

    /// Sends a command and reads the complete reply.
    fn command(&mut self, command: &Command) -> impl Future<Output = Result<Reply>> + Send;

    /// Performs the TLS handshake after the server accepted STARTTLS.
    ///
    /// `server_name` is used for SNI and certificate verification. On error
    /// the connection is unusable.
    fn upgrade_to_tls(&mut self, server_name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Returns true once the TLS handshake has completed.
    fn is_encrypted(&self) -> bool;

    /// Writes raw message bytes during the data phase.
    fn write_data(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Writes the end-of-data marker and reads the server's verdict.
    fn finish_data(&mut self) -> impl Future<Output = Result<Reply>> + Send;
}

/// Opens connections.
pub trait Connector: Send + Sync {
    /// Connection type produced.
    type Transport: Transport;

    /// Connects to `target` (`host:port`).
    fn connect(&self, target: &str) -> impl Future<Output = Result<Self::Transport>> + Send;
}
