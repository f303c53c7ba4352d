//! Data models for the mail adapter.

use crate::user::UserRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Outgoing messages
// ============================================================================

/// A message handed to [`MailAdapter::send_mail`](crate::MailAdapter::send_mail).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: Option<String>,
    /// Plain text body.
    pub text: Option<String>,
}

impl MailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: None,
            text: None,
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Final envelope passed to a transport: the message plus the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailEnvelope {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub html: Option<String>,
    pub text: Option<String>,
}

impl MailEnvelope {
    pub fn new(message: MailMessage, from: impl Into<String>) -> Self {
        Self {
            to: message.to,
            from: from.into(),
            subject: message.subject,
            html: message.html,
            text: message.text,
        }
    }

    /// Domain part of the recipient: everything after the last `@`.
    pub fn recipient_domain(&self) -> &str {
        self.to.rsplit('@').next().unwrap_or_default()
    }
}

// ============================================================================
// Delivery results
// ============================================================================

/// Acknowledgement returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// Transport-specific message ID for tracking.
    pub message_id: Option<String>,
    /// Whether the message was accepted for delivery.
    pub accepted: bool,
}

/// Outcome of a send operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryInfo {
    /// The transport accepted the message.
    Sent(SentEmail),
    /// The message was deliberately not handed to the transport.
    Skipped { reason: String },
}

impl DeliveryInfo {
    pub fn is_skipped(&self) -> bool {
        matches!(self, DeliveryInfo::Skipped { .. })
    }

    pub fn message_id(&self) -> Option<&str> {
        match self {
            DeliveryInfo::Sent(sent) => sent.message_id.as_deref(),
            DeliveryInfo::Skipped { .. } => None,
        }
    }
}

impl fmt::Display for DeliveryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryInfo::Sent(sent) => match &sent.message_id {
                Some(id) => write!(f, "sent ({})", id),
                None => write!(f, "sent"),
            },
            DeliveryInfo::Skipped { reason } => write!(f, "skipped: {}", reason),
        }
    }
}

// ============================================================================
// Operation inputs
// ============================================================================

/// Lifecycle events that trigger an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    PasswordReset,
    EmailVerification,
}

impl LifecycleKind {
    /// Subject used when neither the bundle nor the configuration supplies one.
    pub fn default_subject(&self) -> &'static str {
        match self {
            LifecycleKind::PasswordReset => "Reset Password",
            LifecycleKind::EmailVerification => "Verify Email",
        }
    }
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleKind::PasswordReset => write!(f, "password_reset"),
            LifecycleKind::EmailVerification => write!(f, "email_verification"),
        }
    }
}

/// Data for a password reset or verification email.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEmail {
    pub user: UserRecord,
    #[serde(default)]
    pub app_name: String,
    pub link: String,
    /// Request-level locale, used when the user carries none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl LifecycleEmail {
    pub fn new(user: UserRecord, app_name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            user,
            app_name: app_name.into(),
            link: link.into(),
            locale: None,
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

/// Input for [`MailAdapter::send_mail_with_template`](crate::MailAdapter::send_mail_with_template).
///
/// Every field beyond the named ones is passed to the template as a variable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatedMail {
    pub to: String,
    #[serde(default)]
    pub subject: String,
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub vars: serde_json::Map<String, serde_json::Value>,
}

impl TemplatedMail {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            template: Some(template.into()),
            language: None,
            vars: serde_json::Map::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recipient_domain_uses_last_at() {
        let envelope = MailEnvelope::new(MailMessage::new("odd@name@blocked.com", "s"), "me@x.com");
        assert_eq!(envelope.recipient_domain(), "blocked.com");

        let envelope = MailEnvelope::new(MailMessage::new("no-at-sign", "s"), "me@x.com");
        assert_eq!(envelope.recipient_domain(), "no-at-sign");
    }

    #[test]
    fn test_templated_mail_collects_extra_fields_as_vars() {
        let mail: TemplatedMail = serde_json::from_value(json!({
            "to": "a@x.com",
            "subject": "Hi",
            "template": "templates/hello",
            "language": "french",
            "firstName": "Ada",
        }))
        .unwrap();

        assert_eq!(mail.template.as_deref(), Some("templates/hello"));
        assert_eq!(mail.language.as_deref(), Some("french"));
        assert_eq!(mail.vars.get("firstName"), Some(&json!("Ada")));
        assert!(!mail.vars.contains_key("to"));
    }

    #[test]
    fn test_lifecycle_default_subjects() {
        assert_eq!(LifecycleKind::PasswordReset.default_subject(), "Reset Password");
        assert_eq!(LifecycleKind::EmailVerification.default_subject(), "Verify Email");
    }

    #[test]
    fn test_delivery_info_display() {
        let skipped = DeliveryInfo::Skipped {
            reason: "blacklisted".to_string(),
        };
        assert!(skipped.is_skipped());
        assert_eq!(skipped.to_string(), "skipped: blacklisted");

        let sent = DeliveryInfo::Sent(SentEmail {
            message_id: Some("250 OK".to_string()),
            accepted: true,
        });
        assert_eq!(sent.message_id(), Some("250 OK"));
        assert_eq!(sent.to_string(), "sent (250 OK)");
    }
}
