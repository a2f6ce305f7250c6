//! Server address resolution.
//!
//! Turns the address a caller configured (`host`, `host:port`, `[v6]` or
//! `[v6]:port`) into the hostname used for TLS and authentication, and the
//! target used to dial.

/// Port used when the server address does not name one (message submission).
pub const DEFAULT_PORT: u16 = 587;

/// A resolved server address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    hostname: String,
    target: String,
}

impl Endpoint {
    /// Resolves an address, defaulting to port [`DEFAULT_PORT`].
    #[must_use]
    pub fn resolve(address: &str) -> Self {
        Self::resolve_with_port(address, DEFAULT_PORT)
    }

    /// Resolves an address, appending `default_port` when it has no port.
    #[must_use]
    pub fn resolve_with_port(address: &str, default_port: u16) -> Self {
        match port_separator(address) {
            Some(colon) => Self {
                hostname: address[..colon].to_string(),
                target: address.to_string(),
            },
            None => Self {
                hostname: address.to_string(),
                target: format!("{address}:{default_port}"),
            },
        }
    }

    /// Returns the hostname without any port suffix.
    ///
    /// IPv6 literals keep their brackets.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the `host:port` string to dial.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the hostname in the form used to build a TLS server name:
    /// brackets around an IPv6 literal are removed.
    #[must_use]
    pub fn tls_server_name(&self) -> &str {
        self.hostname
            .strip_prefix('[')
            .and_then(|host| host.strip_suffix(']'))
            .unwrap_or(&self.hostname)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.target)
    }
}

/// Finds the colon separating host and port, if there is one.
///
/// A colon followed by a `]` belongs to an IPv6 literal.
fn port_separator(address: &str) -> Option<usize> {
    let colon = address.rfind(':')?;
    match address.rfind(']') {
        Some(bracket) if bracket > colon => None,
        _ => Some(colon),
    }
}
