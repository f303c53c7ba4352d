//! Gmail transport authenticating with OAuth2 (XOAUTH2).
//!
//! The configured access token is used until its expiry passes; after that a
//! new one is obtained with the refresh token and cached.

use super::smtp::{send_envelope, SmtpEndpoint, SmtpSecurity};
use super::MailTransport;
use crate::config::{OAuth2GmailSettings, DEFAULT_CLIENT_NAME};
use crate::error::{MailAdapterError, MailAdapterResult};
use crate::models::{MailEnvelope, SentEmail};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lettre::transport::smtp::authentication::Mechanism;
use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Google's OAuth2 token endpoint.
pub const GMAIL_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const GMAIL_SMTP_HOST: &str = "smtp.gmail.com";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 30;

/// Expiry of a token issued at `now` for `lifetime`; `None` when out of range.
fn expiry_after(now: DateTime<Utc>, lifetime: std::time::Duration) -> Option<DateTime<Utc>> {
    Duration::from_std(lifetime)
        .ok()
        .and_then(|lifetime| now.checked_add_signed(lifetime))
}

#[derive(Debug, Clone)]
struct CachedToken {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| match at.checked_sub_signed(Duration::seconds(EXPIRY_MARGIN_SECS)) {
                Some(refresh_at) => refresh_at <= now,
                None => true,
            })
    }
}

/// Sends through Gmail's SMTP server as the configured user.
pub struct GmailOAuth2Transport {
    settings: OAuth2GmailSettings,
    token: RwLock<CachedToken>,
    http_client: reqwest::Client,
    token_url: String,
}

impl GmailOAuth2Transport {
    pub fn new(settings: OAuth2GmailSettings) -> MailAdapterResult<Self> {
        if !settings.auth_type.eq_ignore_ascii_case("OAuth2") {
            warn!(auth_type = %settings.auth_type, "Unexpected auth type for Gmail, using OAuth2");
        }

        let expires_at = match settings.expires {
            Some(ms) => Some(DateTime::from_timestamp_millis(ms).ok_or_else(|| {
                MailAdapterError::Config(format!("Invalid token expiry: {}", ms))
            })?),
            None => None,
        };

        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| MailAdapterError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            token: RwLock::new(CachedToken {
                secret: settings.access_token.clone(),
                expires_at,
            }),
            settings,
            http_client,
            token_url: GMAIL_TOKEN_URL.to_string(),
        })
    }

    /// Use a different token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// SMTP endpoint authenticating with `access_token`.
    pub fn endpoint(&self, access_token: String) -> SmtpEndpoint {
        let secure = self.settings.secure.unwrap_or(true);
        let security = if secure {
            SmtpSecurity::Implicit
        } else {
            SmtpSecurity::StartTlsRequired
        };

        SmtpEndpoint {
            host: self
                .settings
                .host
                .clone()
                .unwrap_or_else(|| GMAIL_SMTP_HOST.to_string()),
            port: self.settings.port.unwrap_or_else(|| security.default_port()),
            security,
            hello_name: DEFAULT_CLIENT_NAME.to_string(),
            user: self.settings.user.clone(),
            secret: access_token,
            mechanism: Mechanism::Xoauth2,
            reject_unauthorized: true,
            servername: None,
            label: "oauth2_gmail",
        }
    }

    /// A usable access token, refreshing the cached one if it expired.
    pub async fn access_token(&self) -> MailAdapterResult<String> {
        {
            let token = self.token.read().await;
            if !token.is_expired(Utc::now()) {
                return Ok(token.secret.clone());
            }
        }

        let mut token = self.token.write().await;
        // Another task may have refreshed while we waited for the lock.
        if !token.is_expired(Utc::now()) {
            return Ok(token.secret.clone());
        }

        *token = self.refresh().await?;
        Ok(token.secret.clone())
    }

    async fn refresh(&self) -> MailAdapterResult<CachedToken> {
        debug!(user = %self.settings.user, "Refreshing Gmail access token");

        let client = BasicClient::new(ClientId::new(self.settings.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.settings.client_secret.clone()))
            .set_token_uri(TokenUrl::new(self.token_url.clone()).map_err(|e| {
                MailAdapterError::Config(format!("Invalid token URL: {}", e))
            })?);

        let response = client
            .exchange_refresh_token(&RefreshToken::new(self.settings.refresh_token.clone()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| {
                MailAdapterError::Delivery(format!("Failed to refresh access token: {}", e))
            })?;

        let expires_at = response
            .expires_in()
            .and_then(|lifetime| expiry_after(Utc::now(), lifetime));

        info!(user = %self.settings.user, expires_at = ?expires_at, "Gmail access token refreshed");

        Ok(CachedToken {
            secret: response.access_token().secret().clone(),
            expires_at,
        })
    }
}

#[async_trait]
impl MailTransport for GmailOAuth2Transport {
    async fn deliver(&self, envelope: &MailEnvelope) -> MailAdapterResult<SentEmail> {
        let endpoint = self.endpoint(self.access_token().await?);
        let transport = endpoint.build()?;
        send_envelope(&transport, &endpoint, envelope).await
    }

    fn name(&self) -> &'static str {
        "oauth2_gmail"
    }

    async fn health_check(&self) -> MailAdapterResult<bool> {
        let transport = self.endpoint(self.access_token().await?).build()?;
        transport
            .test_connection()
            .await
            .map_err(|e| MailAdapterError::Delivery(format!("Gmail health check failed: {}", e)))
    }
}
