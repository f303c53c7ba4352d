//! Mail dispatch: sender stamping, blacklist filtering and transport errors.

use crate::error::{MailAdapterError, MailAdapterResult};
use crate::models::{DeliveryInfo, MailEnvelope, MailMessage};
use crate::transport::MailTransport;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Hands messages to the transport on behalf of the configured sender.
#[derive(Clone)]
pub struct MailDispatcher {
    from_address: String,
    blacklisted_domains: Vec<String>,
    transport: Arc<dyn MailTransport>,
}

impl MailDispatcher {
    pub fn new(
        from_address: impl Into<String>,
        blacklisted_domains: Vec<String>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            from_address: from_address.into(),
            blacklisted_domains,
            transport,
        }
    }

    pub fn transport(&self) -> &Arc<dyn MailTransport> {
        &self.transport
    }

    /// Whether mail to `domain` must not be sent. Case-insensitive.
    pub fn is_blacklisted(&self, domain: &str) -> bool {
        self.blacklisted_domains
            .iter()
            .any(|blocked| blocked.eq_ignore_ascii_case(domain))
    }

    /// Send `message` from the configured sender.
    ///
    /// Recipients in a blacklisted domain are skipped without contacting the
    /// transport.
    pub async fn send(&self, message: MailMessage) -> MailAdapterResult<DeliveryInfo> {
        let envelope = MailEnvelope::new(message, self.from_address.clone());
        let domain = envelope.recipient_domain();

        if self.is_blacklisted(domain) {
            let reason = format!(
                "Skipped sending email to {} as domain {} is blacklisted.",
                envelope.to, domain
            );
            info!(to = %envelope.to, domain = %domain, "{}", reason);
            return Ok(DeliveryInfo::Skipped { reason });
        }

        debug!(
            to = %envelope.to,
            transport = self.transport.name(),
            "Dispatching email"
        );

        match self.transport.deliver(&envelope).await {
            Ok(sent) => Ok(DeliveryInfo::Sent(sent)),
            Err(e) => {
                error!(
                    to = %envelope.to,
                    transport = self.transport.name(),
                    error = %e,
                    "Email delivery failed"
                );
                Err(match e {
                    MailAdapterError::Delivery(_) => e,
                    other => MailAdapterError::Delivery(other.to_string()),
                })
            }
        }
    }
}

impl std::fmt::Debug for MailDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailDispatcher")
            .field("from_address", &self.from_address)
            .field("blacklisted_domains", &self.blacklisted_domains)
            .field("transport", &self.transport.name())
            .finish()
    }
}
