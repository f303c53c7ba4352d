//! Mail transports.
//!
//! A transport takes a fully addressed [`MailEnvelope`] and hands it to a mail
//! server. [`build_transport`] constructs exactly one transport from the
//! validated [`TransportConfig`].

mod gmail;
mod service;
mod smtp;

pub use gmail::{GmailOAuth2Transport, GMAIL_TOKEN_URL};
pub use service::{lookup_service, WellKnownService};
pub use smtp::{SmtpEndpoint, SmtpRelay, SmtpSecurity};

use crate::config::TransportConfig;
use crate::error::MailAdapterResult;
use crate::models::{MailEnvelope, SentEmail};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use std::sync::Arc;
use tracing::debug;

/// Trait for mail delivery backends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver an envelope.
    async fn deliver(&self, envelope: &MailEnvelope) -> MailAdapterResult<SentEmail>;

    /// Get the transport name for logging.
    fn name(&self) -> &'static str;

    /// Check that the mail server is reachable and accepts our credentials.
    async fn health_check(&self) -> MailAdapterResult<bool>;
}

/// Build the transport selected by `config`.
pub fn build_transport(config: &TransportConfig) -> MailAdapterResult<Arc<dyn MailTransport>> {
    debug!(transport = %config.kind(), "Building mail transport");

    let transport: Arc<dyn MailTransport> = match config {
        TransportConfig::OAuth2Gmail(settings) => Arc::new(GmailOAuth2Transport::new(settings.clone())?),
        TransportConfig::Smtp(settings) => Arc::new(SmtpRelay::new(SmtpEndpoint::from_smtp(settings))?),
        TransportConfig::Service(settings) => {
            Arc::new(SmtpRelay::new(SmtpEndpoint::from_service(settings))?)
        }
    };
    Ok(transport)
}

/// Build a lettre message from an envelope.
///
/// Both bodies produce a `multipart/alternative` message; a single body is
/// sent as a single part.
pub(crate) fn build_message(envelope: &MailEnvelope) -> MailAdapterResult<Message> {
    let from: Mailbox = envelope.from.parse()?;
    let to: Mailbox = envelope.to.parse()?;

    let builder = Message::builder().from(from).to(to).subject(&envelope.subject);

    let message = match (&envelope.text, &envelope.html) {
        (Some(text), Some(html)) => builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html.clone()),
                ),
        )?,
        (None, Some(html)) => builder.header(ContentType::TEXT_HTML).body(html.clone())?,
        (Some(text), None) => builder.header(ContentType::TEXT_PLAIN).body(text.clone())?,
        (None, None) => builder.header(ContentType::TEXT_PLAIN).body(String::new())?,
    };

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServiceSettings, SmtpSettings};
    use crate::error::MailAdapterError;
    use crate::models::MailMessage;

    fn envelope(message: MailMessage) -> MailEnvelope {
        MailEnvelope::new(message, "App <no-reply@example.com>")
    }

    fn formatted(message: Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn test_both_bodies_build_alternative_message() {
        let message = build_message(&envelope(
            MailMessage::new("a@x.com", "Hello")
                .with_text("plain body")
                .with_html("<p>html body</p>"),
        ))
        .unwrap();

        let raw = formatted(message);
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("plain body"));
        assert!(raw.contains("<p>html body</p>"));
        assert!(raw.contains("Subject: Hello"));
    }

    #[test]
    fn test_single_body_is_single_part() {
        let raw = formatted(build_message(&envelope(MailMessage::new("a@x.com", "Hi").with_text("link"))).unwrap());
        assert!(!raw.contains("multipart"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("link"));
    }

    #[test]
    fn test_empty_recipient_is_delivery_error() {
        let err = build_message(&envelope(MailMessage::new("", "Hi"))).unwrap_err();
        assert!(matches!(err, MailAdapterError::Delivery(_)));
    }

    #[test]
    fn test_invalid_sender_is_delivery_error() {
        let envelope = MailEnvelope::new(MailMessage::new("a@x.com", "Hi"), "not an address");
        assert!(matches!(build_message(&envelope), Err(MailAdapterError::Delivery(_))));
    }

    #[tokio::test]
    async fn test_build_transport_selects_variant() {
        let smtp = build_transport(&TransportConfig::Smtp(SmtpSettings {
            host: "mail.example.com".to_string(),
            port: Some(2525),
            secure: false,
            require_tls: true,
            name: "127.0.0.1".to_string(),
            user: "user".to_string(),
            password: "pass".to_string(),
            reject_unauthorized: true,
            servername: None,
        }))
        .unwrap();
        assert_eq!(smtp.name(), "smtp");

        let service = build_transport(&TransportConfig::Service(ServiceSettings {
            service: "Gmail".to_string(),
            user: "user".to_string(),
            password: "pass".to_string(),
        }))
        .unwrap();
        assert_eq!(service.name(), "service");
    }
}
