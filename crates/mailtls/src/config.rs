//! Submission configuration.

use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;

use crate::resolver::DEFAULT_PORT;

/// Name sent in EHLO when none is configured.
pub const DEFAULT_CLIENT_HOSTNAME: &str = "localhost";

/// Default timeout for establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for each read or write on the connection.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for sending mail.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port dialed when the server address has none.
    pub default_port: u16,
    /// Hostname announced in EHLO.
    pub client_hostname: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Read/write timeout.
    pub io_timeout: Duration,
    /// TLS client configuration used for STARTTLS. `None` uses the webpki
    /// root certificates.
    pub tls: Option<Arc<ClientConfig>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
            client_hostname: DEFAULT_CLIENT_HOSTNAME.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
            tls: None,
        }
    }
}

impl Config {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the port used when the address has none.
    #[must_use]
    pub const fn default_port(mut self, port: u16) -> Self {
        self.config.default_port = port;
        self
    }

    /// Sets the hostname announced in EHLO.
    #[must_use]
    pub fn client_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.config.client_hostname = hostname.into();
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets the I/O timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.config.io_timeout = timeout;
        self
    }

    /// Sets the TLS client configuration (custom roots, client certificates).
    #[must_use]
    pub fn tls_config(mut self, tls: Arc<ClientConfig>) -> Self {
        self.config.tls = Some(tls);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_port, 587);
        assert_eq!(config.client_hostname, "localhost");
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.io_timeout, Duration::from_secs(60));
        assert!(config.tls.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder()
            .default_port(2525)
            .client_hostname("client.example.com")
            .connect_timeout(Duration::from_secs(5))
            .io_timeout(Duration::from_secs(10))
            .build();

        assert_eq!(config.default_port, 2525);
        assert_eq!(config.client_hostname, "client.example.com");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.io_timeout, Duration::from_secs(10));
    }
}
