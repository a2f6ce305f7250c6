//! Synchronous sending for callers without an async runtime.
//!
//! Each call builds a current-thread tokio runtime and drives the same
//! session as [`Mailer::send`](crate::Mailer::send). Must not be called from
//! inside an async context.

use crate::error::{Error, SendError, Stage};
use crate::message::{Email, Server};
use crate::session::Mailer;
use crate::transport::Connector;

/// Sends `email` through `server` with the default configuration, blocking
/// until the session ends.
///
/// # Errors
///
/// Returns the first failure, tagged with the [`Stage`] it happened in.
pub fn send(server: &Server, email: Email) -> Result<(), SendError> {
    send_with(&Mailer::default(), server, email)
}

/// Sends with a configured [`Mailer`], blocking until the session ends.
///
/// # Errors
///
/// Returns the first failure. If the runtime cannot be created the error is
/// reported at [`Stage::Connect`].
pub fn send_with<C: Connector>(
    mailer: &Mailer<C>,
    server: &Server,
    email: Email,
) -> Result<(), SendError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| SendError::new(Stage::Connect, Error::Io(e)))?;
    runtime.block_on(mailer.send(server, email))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_connect_refused_is_reported() {
        // Bind then drop to get a port nobody listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let mailer = Mailer::new(Config::default());
        let server = Server::new(format!("127.0.0.1:{port}"), "user", "pass");
        let err = send_with(&mailer, &server, Email::new("a@x.com", "b@x.com", "Hi", ""))
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Connect);
        assert!(matches!(err.error(), Error::Io(_)));
    }
}
