//! Error types for mail submission.

use std::fmt;
use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Connect or I/O deadline exceeded.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Server returned error response.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Protocol error (unexpected or malformed response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid envelope address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Converts an I/O error from the TLS layer, keeping the rustls cause when
    /// there is one.
    pub(crate) fn from_tls_io(err: io::Error) -> Self {
        match err.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
            Some(tls) => Self::Tls(tls.clone()),
            None => Self::Io(err),
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 400 && *code < 500)
    }
}

/// Step of the submission session at which a send failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Dialing the server and reading its greeting.
    Connect,
    /// EHLO, STARTTLS and the TLS handshake.
    StartTls,
    /// PLAIN authentication.
    Auth,
    /// MAIL FROM.
    Sender,
    /// RCPT TO for one of the to, cc or bcc addresses.
    Recipient,
    /// DATA, the header block, the body and the end-of-data reply.
    Data,
    /// QUIT, after the server accepted the message.
    Quit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::StartTls => "STARTTLS",
            Self::Auth => "authentication",
            Self::Sender => "MAIL FROM",
            Self::Recipient => "RCPT TO",
            Self::Data => "DATA",
            Self::Quit => "QUIT",
        };
        f.write_str(name)
    }
}

/// Error returned by a send: the failed [`Stage`] and its cause.
///
/// A failure at [`Stage::Quit`] is reported even though the server had
/// already answered the end of DATA with a success reply. Whether such a
/// message counts as delivered is left to the caller; see
/// [`SendError::message_accepted`].
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed{}: {source}", for_address(.address))]
pub struct SendError {
    stage: Stage,
    address: Option<String>,
    #[source]
    source: Error,
}

fn for_address(address: &Option<String>) -> String {
    address
        .as_deref()
        .map(|addr| format!(" for <{addr}>"))
        .unwrap_or_default()
}

impl SendError {
    pub(crate) const fn new(stage: Stage, source: Error) -> Self {
        Self {
            stage,
            address: None,
            source,
        }
    }

    pub(crate) fn with_address(stage: Stage, address: impl Into<String>, source: Error) -> Self {
        Self {
            stage,
            address: Some(address.into()),
            source,
        }
    }

    /// Returns the step that failed.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Returns the envelope address involved, for sender and recipient failures.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Returns the underlying error.
    #[must_use]
    pub const fn error(&self) -> &Error {
        &self.source
    }

    /// Consumes the error, returning the underlying cause.
    #[must_use]
    pub fn into_error(self) -> Error {
        self.source
    }

    /// Returns true when the server accepted the message and only the
    /// closing QUIT exchange failed.
    #[must_use]
    pub fn message_accepted(&self) -> bool {
        self.stage == Stage::Quit
    }
}
