//! Commands the submission session sends, and their wire form.

use crate::types::{Address, AuthMechanism};

/// One client command. Serialized as a single CRLF-terminated line.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// `EHLO <name>`, sent before and after STARTTLS.
    Ehlo {
        /// Name the client announces.
        hostname: String,
    },
    /// `STARTTLS`.
    StartTls,
    /// `AUTH <mechanism> <initial response>` (SASL-IR).
    Auth {
        /// Mechanism name.
        mechanism: AuthMechanism,
        /// Base64 initial response. Carries the password.
        initial_response: String,
    },
    /// `MAIL FROM:<path>`.
    MailFrom {
        /// Reverse path.
        from: Address,
    },
    /// `RCPT TO:<path>`, once per recipient.
    RcptTo {
        /// Forward path.
        to: Address,
    },
    /// `DATA`.
    Data,
    /// `QUIT`.
    Quit,
}

impl Command {
    /// Returns the command line, CRLF included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let line = match self {
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::Auth {
                mechanism,
                initial_response,
            } => format!("AUTH {} {initial_response}", mechanism.as_str()),
            Self::MailFrom { from } => format!("MAIL FROM:<{from}>"),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::StartTls | Self::Data | Self::Quit => self.verb().to_string(),
        };

        let mut buf = line.into_bytes();
        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns the command verb, safe to log.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::Auth { .. } => "AUTH",
            Self::MailFrom { .. } => "MAIL FROM",
            Self::RcptTo { .. } => "RCPT TO",
            Self::Data => "DATA",
            Self::Quit => "QUIT",
        }
    }
}

// The AUTH initial response is a base64 copy of the password.
impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ehlo { hostname } => f.debug_struct("Ehlo").field("hostname", hostname).finish(),
            Self::StartTls => f.write_str("StartTls"),
            Self::Auth { mechanism, .. } => f
                .debug_struct("Auth")
                .field("mechanism", mechanism)
                .finish_non_exhaustive(),
            Self::MailFrom { from } => f.debug_struct("MailFrom").field("from", from).finish(),
            Self::RcptTo { to } => f.debug_struct("RcptTo").field("to", to).finish(),
            Self::Data => f.write_str("Data"),
            Self::Quit => f.write_str("Quit"),
        }
    }
}
