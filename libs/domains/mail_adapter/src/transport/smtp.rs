//! SMTP relay transport using lettre.
//!
//! Serves both the explicit SMTP configuration and named well-known services;
//! the two differ only in how the endpoint is derived.

use super::service::lookup_service;
use super::{build_message, MailTransport};
use crate::config::{ServiceSettings, SmtpSettings, DEFAULT_CLIENT_NAME};
use crate::error::{MailAdapterError, MailAdapterResult};
use crate::models::{MailEnvelope, SentEmail};
use async_trait::async_trait;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::{debug, error, info, warn};

/// Port for implicit TLS submission.
pub const IMPLICIT_TLS_PORT: u16 = 465;

/// Port for STARTTLS submission.
pub const SUBMISSION_PORT: u16 = 587;

/// How the connection to the server is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// TLS from the first byte.
    Implicit,
    /// Plain connection that must be upgraded with STARTTLS.
    StartTlsRequired,
    /// STARTTLS when the server offers it.
    Opportunistic,
}

impl SmtpSecurity {
    pub fn default_port(&self) -> u16 {
        match self {
            SmtpSecurity::Implicit => IMPLICIT_TLS_PORT,
            SmtpSecurity::StartTlsRequired | SmtpSecurity::Opportunistic => SUBMISSION_PORT,
        }
    }
}

/// Everything needed to open an authenticated SMTP connection.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpEndpoint {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub hello_name: String,
    pub user: String,
    pub secret: String,
    pub mechanism: Mechanism,
    pub reject_unauthorized: bool,
    pub servername: Option<String>,
    pub label: &'static str,
}

impl std::fmt::Debug for SmtpEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("hello_name", &self.hello_name)
            .field("user", &self.user)
            .field("mechanism", &self.mechanism)
            .field("reject_unauthorized", &self.reject_unauthorized)
            .field("servername", &self.servername)
            .finish_non_exhaustive()
    }
}

impl SmtpEndpoint {
    /// Endpoint for an explicitly configured SMTP server.
    ///
    /// `secure` selects implicit TLS, `requireTLS` a mandatory STARTTLS
    /// upgrade; otherwise STARTTLS is used when offered.
    pub fn from_smtp(settings: &SmtpSettings) -> Self {
        let security = if settings.secure {
            SmtpSecurity::Implicit
        } else if settings.require_tls {
            SmtpSecurity::StartTlsRequired
        } else {
            SmtpSecurity::Opportunistic
        };

        Self {
            host: settings.host.clone(),
            port: settings.port.unwrap_or_else(|| security.default_port()),
            security,
            hello_name: settings.name.clone(),
            user: settings.user.clone(),
            secret: settings.password.clone(),
            mechanism: Mechanism::Plain,
            reject_unauthorized: settings.reject_unauthorized,
            servername: settings.servername.clone(),
            label: "smtp",
        }
    }

    /// Endpoint for a named service.
    ///
    /// Unknown names are used as the relay host.
    pub fn from_service(settings: &ServiceSettings) -> Self {
        let (host, port, security) = match lookup_service(&settings.service) {
            Some(known) => {
                let security = if known.secure {
                    SmtpSecurity::Implicit
                } else {
                    SmtpSecurity::StartTlsRequired
                };
                (known.host.to_string(), known.port, security)
            }
            None => {
                warn!(
                    service = %settings.service,
                    "Unknown mail service, using its name as the SMTP host"
                );
                (settings.service.clone(), SUBMISSION_PORT, SmtpSecurity::Opportunistic)
            }
        };

        Self {
            host,
            port,
            security,
            hello_name: DEFAULT_CLIENT_NAME.to_string(),
            user: settings.user.clone(),
            secret: settings.password.clone(),
            mechanism: Mechanism::Plain,
            reject_unauthorized: true,
            servername: None,
            label: "service",
        }
    }

    fn client_id(&self) -> ClientId {
        if let Ok(ip) = self.hello_name.parse::<Ipv4Addr>() {
            ClientId::Ipv4(ip)
        } else if let Ok(ip) = self.hello_name.parse::<Ipv6Addr>() {
            ClientId::Ipv6(ip)
        } else {
            ClientId::Domain(self.hello_name.clone())
        }
    }

    fn tls(&self) -> MailAdapterResult<Tls> {
        let domain = self.servername.clone().unwrap_or_else(|| self.host.clone());
        let parameters = TlsParameters::builder(domain)
            .dangerous_accept_invalid_certs(!self.reject_unauthorized)
            .build()
            .map_err(|e| MailAdapterError::Delivery(format!("TLS configuration failed: {}", e)))?;

        Ok(match self.security {
            SmtpSecurity::Implicit => Tls::Wrapper(parameters),
            SmtpSecurity::StartTlsRequired => Tls::Required(parameters),
            SmtpSecurity::Opportunistic => Tls::Opportunistic(parameters),
        })
    }

    /// Build the lettre transport. No connection is opened.
    pub fn build(&self) -> MailAdapterResult<AsyncSmtpTransport<Tokio1Executor>> {
        let mechanisms = match self.mechanism {
            Mechanism::Xoauth2 => vec![Mechanism::Xoauth2],
            _ => vec![Mechanism::Plain, Mechanism::Login],
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host)
            .port(self.port)
            .tls(self.tls()?)
            .hello_name(self.client_id());
        if let Some(credentials) = self.credentials() {
            builder = builder.credentials(credentials).authentication(mechanisms);
        }
        Ok(builder.build())
    }

    /// Login credentials, or `None` for an unauthenticated relay.
    pub fn credentials(&self) -> Option<Credentials> {
        if self.user.is_empty() && self.secret.is_empty() {
            return None;
        }
        Some(Credentials::new(self.user.clone(), self.secret.clone()))
    }
}

/// Sends through a single SMTP server.
pub struct SmtpRelay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    endpoint: SmtpEndpoint,
}

impl SmtpRelay {
    pub fn new(endpoint: SmtpEndpoint) -> MailAdapterResult<Self> {
        let transport = endpoint.build()?;
        Ok(Self { transport, endpoint })
    }

    pub fn endpoint(&self) -> &SmtpEndpoint {
        &self.endpoint
    }
}

/// Send `envelope` through `transport`, logging on both outcomes.
pub(crate) async fn send_envelope(
    transport: &AsyncSmtpTransport<Tokio1Executor>,
    endpoint: &SmtpEndpoint,
    envelope: &MailEnvelope,
) -> MailAdapterResult<SentEmail> {
    debug!(
        to = %envelope.to,
        subject = %envelope.subject,
        host = %endpoint.host,
        port = endpoint.port,
        security = ?endpoint.security,
        "Sending email via SMTP"
    );

    let message = build_message(envelope)?;

    let response = transport.send(message).await.map_err(|e| {
        error!(to = %envelope.to, host = %endpoint.host, error = %e, "Failed to send email via SMTP");
        MailAdapterError::from(e)
    })?;

    let message_id = response.message().next().map(|s| s.to_string());

    info!(
        to = %envelope.to,
        message_id = ?message_id,
        "Email sent successfully via SMTP"
    );

    Ok(SentEmail {
        message_id,
        accepted: response.is_positive(),
    })
}

#[async_trait]
impl MailTransport for SmtpRelay {
    async fn deliver(&self, envelope: &MailEnvelope) -> MailAdapterResult<SentEmail> {
        send_envelope(&self.transport, &self.endpoint, envelope).await
    }

    fn name(&self) -> &'static str {
        self.endpoint.label
    }

    async fn health_check(&self) -> MailAdapterResult<bool> {
        self.transport
            .test_connection()
            .await
            .map_err(|e| MailAdapterError::Delivery(format!("SMTP health check failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_settings() -> SmtpSettings {
        SmtpSettings {
            host: "mail.example.com".to_string(),
            port: None,
            secure: false,
            require_tls: false,
            name: DEFAULT_CLIENT_NAME.to_string(),
            user: "mailer".to_string(),
            password: "secret".to_string(),
            reject_unauthorized: true,
            servername: None,
        }
    }

    #[test]
    fn test_secure_selects_implicit_tls() {
        let endpoint = SmtpEndpoint::from_smtp(&SmtpSettings {
            secure: true,
            ..smtp_settings()
        });
        assert_eq!(endpoint.security, SmtpSecurity::Implicit);
        assert_eq!(endpoint.port, 465);
    }

    #[test]
    fn test_require_tls_selects_mandatory_starttls() {
        let endpoint = SmtpEndpoint::from_smtp(&SmtpSettings {
            require_tls: true,
            port: Some(2525),
            ..smtp_settings()
        });
        assert_eq!(endpoint.security, SmtpSecurity::StartTlsRequired);
        assert_eq!(endpoint.port, 2525);
    }

    #[test]
    fn test_plain_settings_use_opportunistic_starttls() {
        let endpoint = SmtpEndpoint::from_smtp(&smtp_settings());
        assert_eq!(endpoint.security, SmtpSecurity::Opportunistic);
        assert_eq!(endpoint.port, 587);
        assert_eq!(endpoint.label, "smtp");
    }

    #[test]
    fn test_hello_name_parses_ip_literals() {
        let mut endpoint = SmtpEndpoint::from_smtp(&smtp_settings());
        assert_eq!(endpoint.client_id(), ClientId::Ipv4(Ipv4Addr::LOCALHOST));

        endpoint.hello_name = "relay.example.com".to_string();
        assert_eq!(endpoint.client_id(), ClientId::Domain("relay.example.com".to_string()));
    }

    #[test]
    fn test_known_service_endpoint() {
        let endpoint = SmtpEndpoint::from_service(&ServiceSettings {
            service: "Gmail".to_string(),
            user: "me@gmail.com".to_string(),
            password: "app-password".to_string(),
        });
        assert_eq!(endpoint.host, "smtp.gmail.com");
        assert_eq!(endpoint.port, 465);
        assert_eq!(endpoint.security, SmtpSecurity::Implicit);
        assert_eq!(endpoint.label, "service");
    }

    #[test]
    fn test_unknown_service_is_used_as_host() {
        let endpoint = SmtpEndpoint::from_service(&ServiceSettings {
            service: "mail.internal.example".to_string(),
            user: "u".to_string(),
            password: "p".to_string(),
        });
        assert_eq!(endpoint.host, "mail.internal.example");
        assert_eq!(endpoint.security, SmtpSecurity::Opportunistic);
    }

    #[test]
    fn test_blank_login_skips_authentication() {
        let endpoint = SmtpEndpoint::from_smtp(&SmtpSettings {
            user: String::new(),
            password: String::new(),
            ..smtp_settings()
        });
        assert!(endpoint.credentials().is_none());

        let endpoint = SmtpEndpoint::from_smtp(&SmtpSettings {
            password: String::new(),
            ..smtp_settings()
        });
        assert!(endpoint.credentials().is_some());
    }

    #[test]
    fn test_debug_hides_secret() {
        let endpoint = SmtpEndpoint::from_smtp(&smtp_settings());
        assert!(!format!("{:?}", endpoint).contains("secret\""));
    }

    #[tokio::test]
    async fn test_relay_builds_without_connecting() {
        let relay = SmtpRelay::new(SmtpEndpoint::from_smtp(&SmtpSettings {
            reject_unauthorized: false,
            servername: Some("relay.example.com".to_string()),
            ..smtp_settings()
        }))
        .unwrap();
        assert_eq!(relay.name(), "smtp");
        assert!(!relay.endpoint().reject_unauthorized);
    }
}
