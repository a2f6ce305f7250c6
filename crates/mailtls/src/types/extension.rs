//! EHLO extension types.

use std::collections::HashSet;

/// SMTP extensions the submission session cares about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - Authentication, with the advertised mechanism names
    Auth(Vec<String>),
    /// Any other extension line
    Unknown(String),
}

impl Extension {
    /// Parses an extension line from EHLO response.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            return Self::Unknown(line.to_string());
        };

        match keyword.to_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(parts.map(str::to_uppercase).collect()),
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - plaintext authentication (RFC 4616)
    Plain,
}

impl AuthMechanism {
    /// Returns the mechanism name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
        }
    }
}

/// Extensions advertised in an EHLO reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions(HashSet<Extension>);

impl Extensions {
    /// Parses the lines of an EHLO reply. The first line is the server's
    /// greeting and is skipped.
    #[must_use]
    pub fn from_ehlo<S: AsRef<str>>(lines: &[S]) -> Self {
        Self(
            lines
                .iter()
                .skip(1)
                .map(|line| Extension::parse(line.as_ref()))
                .collect(),
        )
    }

    /// Checks if STARTTLS is advertised.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.0.contains(&Extension::StartTls)
    }

    /// Checks if AUTH is advertised at all.
    #[must_use]
    pub fn supports_auth(&self) -> bool {
        self.0.iter().any(|ext| matches!(ext, Extension::Auth(_)))
    }

    /// Returns the advertised authentication mechanism names.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.iter().map(String::as_str)),
                _ => None,
            })
            .flatten()
            .collect()
    }
}
