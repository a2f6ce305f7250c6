//! # mailtls
//!
//! Send an email over SMTP with STARTTLS and PLAIN authentication.
//!
//! ## Features
//!
//! - **Mandatory encryption**: the session upgrades with STARTTLS before
//!   anything else and never falls back to plaintext
//! - **PLAIN authentication** only after the TLS handshake has completed
//! - **Envelope from headers**: To, CC and BCC become recipients; BCC never
//!   appears in a header
//! - **Streaming body**: any `AsyncRead`, sent verbatim and read exactly once
//! - **Default port 587** when the server address has none
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailtls::{Email, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mailtls::SendError> {
//!     let server = Server::new("mail.example.com", "myusername", "mypassword");
//!     let email = Email::new(
//!         "Someone <someone@example.com>",
//!         "Me <me@example.com>",
//!         "A subject",
//!         "Lol.\r\n",
//!     );
//!     mailtls::send(&server, email).await
//! }
//! ```
//!
//! ## Session
//!
//! ```text
//! Disconnected → Connected → Encrypted → Authenticated
//!              → EnvelopeSet → DataPhase → Sent → Closed
//! ```
//!
//! Every step fails fast. A [`SendError`] names the [`Stage`] that failed;
//! a failure at [`Stage::Quit`] is still reported although the server had
//! accepted the message, since the two outcomes cannot be told apart from
//! the session alone.
//!
//! ## Modules
//!
//! - [`blocking`]: synchronous wrapper
//! - [`command`]: SMTP command builders
//! - [`parser`]: Response parser
//! - [`resolver`]: Server address to hostname and dial target
//! - [`transport`]: Connection capability and the TCP/rustls implementation
//! - [`types`]: Core SMTP types (addresses, extensions, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod blocking;
pub mod command;
mod config;
mod error;
mod message;
pub mod parser;
pub mod resolver;
mod session;
pub mod transport;
pub mod types;

pub use config::{
    Config, ConfigBuilder, DEFAULT_CLIENT_HOSTNAME, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT,
};
pub use error::{Error, Result, SendError, Stage};
pub use message::{Body, DATE_FORMAT, Email, Server};
pub use resolver::{DEFAULT_PORT, Endpoint};
pub use session::{AUTH_MECHANISM, Mailer, send};
pub use transport::{Connector, TcpConnector, Transport};
