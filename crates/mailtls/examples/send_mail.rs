#![allow(clippy::expect_used, clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: Send one message through a submission server
//!
//! ## Running
//!
//! ```bash
//! export MAILTLS_SERVER=mail.example.com      # port defaults to 587
//! export MAILTLS_USER=myusername
//! export MAILTLS_FROM="Me <me@example.com>"
//! RUST_LOG=mailtls=debug cargo run --package mailtls --example send_mail -- someone@example.com
//! ```
//!
//! The password is read from `MAILTLS_PASSWORD`, or prompted for.

use std::env;
use std::io::{self, Write};

use anyhow::Context;
use mailtls::{Email, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailtls=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let to = env::args()
        .nth(1)
        .context("usage: send_mail <recipient>")?;
    let address = env::var("MAILTLS_SERVER").context("MAILTLS_SERVER is not set")?;
    let user = env::var("MAILTLS_USER").context("MAILTLS_USER is not set")?;
    let from = env::var("MAILTLS_FROM").unwrap_or_else(|_| user.clone());

    let password = match env::var("MAILTLS_PASSWORD") {
        Ok(password) => password,
        Err(_) => {
            print!("Password for {}: ", user);
            io::stdout().flush()?;
            let mut password = String::new();
            io::stdin().read_line(&mut password)?;
            password.trim().to_string()
        }
    };

    let server = Server::new(address, user, password);
    let email = Email::new(to, from, "A subject", "Lol.\r\n")
        .header("X-Mailer: mailtls");

    println!("Sending through {}...", server.address);
    match mailtls::send(&server, email).await {
        Ok(()) => println!("✓ Sent"),
        Err(err) if err.message_accepted() => {
            println!("✓ Accepted by the server ({err})");
        }
        Err(err) => return Err(err).context("sending failed"),
    }

    Ok(())
}
