//! Envelope address types.

use crate::error::{Error, Result};

/// Address for the SMTP envelope (the part inside `MAIL FROM:<...>` and
/// `RCPT TO:<...>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates an address from a bare path such as `user@example.com`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is empty or would break the command
    /// line it is placed in.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Extracts the envelope address from a header-style mailbox.
    ///
    /// `Someone <someone@example.com>` yields `someone@example.com`; a value
    /// without angle brackets is taken as a bare address.
    ///
    /// # Errors
    ///
    /// Returns an error if the brackets are unbalanced or the address is
    /// invalid.
    pub fn from_mailbox(mailbox: &str) -> Result<Self> {
        let mailbox = mailbox.trim();
        if mailbox.contains(['\r', '\n']) {
            return Err(Error::InvalidAddress(
                "Mailbox cannot contain CR or LF".into(),
            ));
        }
        let addr = match (mailbox.rfind('<'), mailbox.ends_with('>')) {
            (Some(open), true) => &mailbox[open + 1..mailbox.len() - 1],
            (None, false) => mailbox,
            _ => {
                return Err(Error::InvalidAddress(format!(
                    "Unbalanced angle brackets in {mailbox:?}"
                )));
            }
        };
        Self::new(addr.trim())
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        if addr.contains(['\r', '\n']) {
            return Err(Error::InvalidAddress(
                "Address cannot contain CR or LF".into(),
            ));
        }

        if addr.contains(['<', '>']) {
            return Err(Error::InvalidAddress(format!(
                "Unexpected angle bracket in {addr:?}"
            )));
        }

        Ok(())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
