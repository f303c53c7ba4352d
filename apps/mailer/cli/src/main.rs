//! Mailer CLI - Entry Point
//!
//! Operator tool for checking mail adapter configuration and sending mail.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    mailer_cli::run().await
}
