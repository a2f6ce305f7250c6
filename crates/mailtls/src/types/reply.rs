//! Server replies and reply codes.

use crate::error::{Error, Result};

/// A complete (possibly multi-line) server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit code shared by every line.
    pub code: ReplyCode,
    /// Text of each line, code and separator removed.
    pub message: Vec<String>,
}

impl Reply {
    /// Builds a reply from its code and text lines.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// True for a 2xx reply.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Joins the text lines with `\n`.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }

    /// Returns the reply if its code is `expected`, otherwise an SMTP error
    /// carrying the server's code and text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SmtpError`] when the code differs.
    pub fn expect_code(self, expected: ReplyCode) -> Result<Self> {
        if self.code == expected {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    /// Returns the reply if it is a 2xx success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SmtpError`] for any other class.
    pub fn expect_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    fn into_error(self) -> Error {
        Error::smtp_error(self.code.as_u16(), self.message_text())
    }
}

/// Three-digit SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// `220`, greeting and STARTTLS go-ahead.
    pub const SERVICE_READY: Self = Self(220);
    /// `221`, answer to QUIT.
    pub const CLOSING: Self = Self(221);
    /// `235`, authentication accepted.
    pub const AUTH_SUCCESS: Self = Self(235);
    /// `250`, command accepted.
    pub const OK: Self = Self(250);
    /// `354`, send the message then `.`.
    pub const START_DATA: Self = Self(354);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// The numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// True for the 2xx class.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self.0, 200..=299)
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.0)
    }
}
