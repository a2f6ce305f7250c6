//! Server credentials and the message to send.

use std::fmt::{self, Display, Write};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, TimeZone};
use serde::Deserialize;
use tokio::io::{AsyncRead, ReadBuf};

/// `Date:` header format (RFC 1123 with a numeric zone).
pub const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Server address and credentials.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Server {
    /// `host`, `host:port`, `[ipv6]` or `[ipv6]:port`, e.g. `smtp.example.com:587`.
    pub address: String,
    /// Username for PLAIN authentication.
    pub user: String,
    /// Password for PLAIN authentication.
    pub password: String,
}

impl Server {
    /// Creates a server descriptor.
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("address", &self.address)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Message body: any byte stream, read once to the end while sending.
pub struct Body(Pin<Box<dyn AsyncRead + Send>>);

impl Body {
    /// Wraps a reader.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self(Box::pin(reader))
    }

    /// An empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_reader(tokio::io::empty())
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body").finish_non_exhaustive()
    }
}

impl AsyncRead for Body {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.0.as_mut().poll_read(cx, buf)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_reader(io::Cursor::new(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        text.into_bytes().into()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from_reader(text.as_bytes())
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self::from_reader(bytes)
    }
}

/// An email to send.
///
/// `to`, `from`, `cc` and `bcc` may be bare addresses or carry a display
/// name (`Someone <someone@example.com>`). Header lines use them verbatim;
/// the SMTP envelope uses the address part only.
#[derive(Debug, Default)]
pub struct Email {
    /// Primary recipient.
    pub to: String,
    /// Sender.
    pub from: String,
    /// Subject line.
    pub subject: String,
    /// Carbon-copy recipients, written as `CC:` headers.
    pub cc: Vec<String>,
    /// Blind-copy recipients. Never written to any header.
    pub bcc: Vec<String>,
    /// Extra raw header lines (`Name: value`), written in order after the
    /// standard headers. Must not repeat To, From, Subject, CC or Date.
    pub headers: Vec<String>,
    /// Message body, sent verbatim after the header block.
    pub body: Body,
}

impl Email {
    /// Creates an email with one recipient.
    #[must_use]
    pub fn new(
        to: impl Into<String>,
        from: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<Body>,
    ) -> Self {
        Self {
            to: to.into(),
            from: from.into(),
            subject: subject.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    /// Adds a BCC recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<String>) -> Self {
        self.bcc.push(recipient.into());
        self
    }

    /// Adds a raw header line such as `Reply-To: me@example.com`.
    #[must_use]
    pub fn header(mut self, line: impl Into<String>) -> Self {
        self.headers.push(line.into());
        self
    }

    /// Returns the envelope recipients in RCPT order: to, cc, then bcc.
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.to.as_str())
            .chain(self.cc.iter().map(String::as_str))
            .chain(self.bcc.iter().map(String::as_str))
    }

    /// Renders the header block, blank separator line included.
    #[must_use]
    pub fn header_block<Tz>(&self, date: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut block = String::new();

        let _ = write!(block, "To: {}\r\n", self.to);
        let _ = write!(block, "From: {}\r\n", self.from);
        let _ = write!(block, "Subject: {}\r\n", self.subject);
        let _ = write!(block, "Date: {}\r\n", date.format(DATE_FORMAT));
        for cc in &self.cc {
            let _ = write!(block, "CC: {cc}\r\n");
        }
        for header in &self.headers {
            let _ = write!(block, "{header}\r\n");
        }

        // Empty line between headers and body
        block.push_str("\r\n");
        block
    }
}
