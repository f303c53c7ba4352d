//! Adapter configuration.
//!
//! Options arrive as a loose bag of optional fields ([`AdapterOptions`]), the
//! same shape the host framework hands to every mail adapter. They are
//! validated once into an [`AdapterConfig`] whose transport part is a sum type:
//! an adapter is either an OAuth2 Gmail sender, a plain SMTP sender or a named
//! well-known service, never a mix of the three.

use crate::error::{MailAdapterError, MailAdapterResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Service name selecting the OAuth2 Gmail transport.
pub const SERVICE_OAUTH2_GMAIL: &str = "OAuth2Gmail";

/// Service name selecting the plain SMTP transport.
pub const SERVICE_SMTP: &str = "SMTP";

/// Default HELO/EHLO name announced to SMTP servers.
pub const DEFAULT_CLIENT_NAME: &str = "127.0.0.1";

const OAUTH2_GMAIL_REQUIREMENTS: &str = "Gmail API adapter requires service, type, fromAddress, user, clientId, clientSecret, refreshToken and accessToken";
const SMTP_REQUIREMENTS: &str = "SMTP adapter requires user, password, host, secure and fromAddress";
const SERVICE_REQUIREMENTS: &str = "Please choose a supported service (OAuth2Gmail, SMTP, or a named service) and enter user, password and fromAddress";

/// Caller-supplied TLS options for the SMTP transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsOptions {
    /// Whether invalid server certificates are rejected.
    pub reject_unauthorized: Option<bool>,
    /// Server name used for certificate verification, if it differs from `host`.
    pub servername: Option<String>,
}

/// A lifecycle template: a template id plus the subject used when the
/// rendered bundle carries none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub template: String,
    pub subject: Option<String>,
}

/// Templates for the lifecycle emails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatesConfig {
    pub reset_password: Option<TemplateSpec>,
    pub verify_email: Option<TemplateSpec>,
}

/// Localization settings handed to the template renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct I18nConfig {
    /// Locales whose template variants are rendered. Empty means all.
    #[serde(default)]
    pub locales: Vec<String>,
    /// Locale used when none could be resolved for a message.
    pub default_locale: Option<String>,
    /// Directory holding `<locale>.json` translation files.
    pub directory: Option<PathBuf>,
}

/// Raw adapter options, as supplied by the host framework.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterOptions {
    pub service: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub secure: Option<bool>,
    #[serde(rename = "requireTLS")]
    pub require_tls: Option<bool>,
    pub tls: Option<TlsOptions>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "type")]
    pub auth_type: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    /// Access token expiry, in milliseconds since the Unix epoch.
    pub expires: Option<i64>,
    pub from_address: Option<String>,
    pub email_field: Option<String>,
    pub templates: Option<TemplatesConfig>,
    pub blacklisted_domains: Option<Vec<String>>,
    pub is_tls_reject_unauthorized: Option<bool>,
    pub i18n: Option<I18nConfig>,
}

/// Settings for the OAuth2 Gmail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2GmailSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub secure: Option<bool>,
    pub auth_type: String,
    pub user: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub access_token: String,
    pub expires: Option<i64>,
}

/// Settings for the plain SMTP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: Option<u16>,
    pub secure: bool,
    pub require_tls: bool,
    pub name: String,
    pub user: String,
    pub password: String,
    pub reject_unauthorized: bool,
    pub servername: Option<String>,
}

/// Settings for a named well-known service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub service: String,
    pub user: String,
    pub password: String,
}

/// The transport an adapter delivers through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    OAuth2Gmail(OAuth2GmailSettings),
    Smtp(SmtpSettings),
    Service(ServiceSettings),
}

/// Kind of transport, without its settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    OAuth2Gmail,
    Smtp,
    Service,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::OAuth2Gmail => write!(f, "oauth2_gmail"),
            TransportKind::Smtp => write!(f, "smtp"),
            TransportKind::Service => write!(f, "service"),
        }
    }
}

impl TransportConfig {
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportConfig::OAuth2Gmail(_) => TransportKind::OAuth2Gmail,
            TransportConfig::Smtp(_) => TransportKind::Smtp,
            TransportConfig::Service(_) => TransportKind::Service,
        }
    }
}

/// Validated, immutable adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    pub transport: TransportConfig,
    pub from_address: String,
    pub email_field: Option<String>,
    pub templates: TemplatesConfig,
    pub blacklisted_domains: Vec<String>,
    pub i18n: Option<I18nConfig>,
}

impl AdapterConfig {
    /// Build a configuration from an arbitrary JSON value.
    ///
    /// `null` is rejected the same way a missing options object is.
    pub fn from_value(value: serde_json::Value) -> MailAdapterResult<Self> {
        if value.is_null() {
            return Err(MailAdapterError::Config("adapter options required".to_string()));
        }
        let options: AdapterOptions = serde_json::from_value(value)?;
        options.validate()
    }

    /// Whether localized template selection is enabled.
    pub fn is_localized(&self) -> bool {
        self.i18n.is_some()
    }
}

/// Required fields only need to be set; `fromAddress` must also be non-blank.
fn present(field: &str, value: &Option<String>) -> bool {
    match field {
        "fromAddress" => value.as_deref().is_some_and(|v| !v.trim().is_empty()),
        _ => value.is_some(),
    }
}

fn required(value: Option<String>) -> String {
    value.unwrap_or_default()
}

fn missing_error(requirements: &str, missing: &[&str]) -> MailAdapterError {
    MailAdapterError::Config(format!("{} (missing: {})", requirements, missing.join(", ")))
}

impl AdapterOptions {
    /// Validate the options against the shape selected by `service`.
    pub fn validate(self) -> MailAdapterResult<AdapterConfig> {
        let transport = match self.service.as_deref() {
            Some(SERVICE_OAUTH2_GMAIL) => self.oauth2_gmail_settings()?,
            Some(SERVICE_SMTP) => self.smtp_settings()?,
            _ => self.service_settings()?,
        };

        Ok(AdapterConfig {
            transport,
            from_address: required(self.from_address),
            email_field: self.email_field.filter(|field| !field.is_empty()),
            templates: self.templates.unwrap_or_default(),
            blacklisted_domains: self
                .blacklisted_domains
                .unwrap_or_default()
                .into_iter()
                .map(|domain| domain.trim().to_string())
                .filter(|domain| !domain.is_empty())
                .collect(),
            i18n: self.i18n,
        })
    }

    fn oauth2_gmail_settings(&self) -> MailAdapterResult<TransportConfig> {
        let mut missing = Vec::new();
        for (field, value) in [
            ("type", &self.auth_type),
            ("user", &self.user),
            ("fromAddress", &self.from_address),
            ("clientId", &self.client_id),
            ("clientSecret", &self.client_secret),
            ("refreshToken", &self.refresh_token),
            ("accessToken", &self.access_token),
        ] {
            if !present(field, value) {
                missing.push(field);
            }
        }
        if !missing.is_empty() {
            return Err(missing_error(OAUTH2_GMAIL_REQUIREMENTS, &missing));
        }

        Ok(TransportConfig::OAuth2Gmail(OAuth2GmailSettings {
            host: self.host.clone(),
            port: self.port,
            secure: self.secure,
            auth_type: required(self.auth_type.clone()),
            user: required(self.user.clone()),
            client_id: required(self.client_id.clone()),
            client_secret: required(self.client_secret.clone()),
            refresh_token: required(self.refresh_token.clone()),
            access_token: required(self.access_token.clone()),
            expires: self.expires,
        }))
    }

    fn smtp_settings(&self) -> MailAdapterResult<TransportConfig> {
        let mut missing = Vec::new();
        for (field, value) in [
            ("user", &self.user),
            ("password", &self.password),
            ("host", &self.host),
            ("fromAddress", &self.from_address),
        ] {
            if !present(field, value) {
                missing.push(field);
            }
        }
        if self.secure.is_none() {
            missing.push("secure");
        }
        if !missing.is_empty() {
            return Err(missing_error(SMTP_REQUIREMENTS, &missing));
        }

        Ok(TransportConfig::Smtp(SmtpSettings {
            host: required(self.host.clone()),
            port: self.port,
            secure: self.secure.unwrap_or_default(),
            require_tls: self.require_tls.unwrap_or(false),
            name: self
                .name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
            user: required(self.user.clone()),
            password: required(self.password.clone()),
            reject_unauthorized: self.reject_unauthorized(),
            servername: self.tls.as_ref().and_then(|tls| tls.servername.clone()),
        }))
    }

    fn service_settings(&self) -> MailAdapterResult<TransportConfig> {
        let mut missing = Vec::new();
        for (field, value) in [
            ("user", &self.user),
            ("password", &self.password),
            ("service", &self.service),
            ("fromAddress", &self.from_address),
        ] {
            if !present(field, value) {
                missing.push(field);
            }
        }
        if !missing.is_empty() {
            return Err(missing_error(SERVICE_REQUIREMENTS, &missing));
        }

        Ok(TransportConfig::Service(ServiceSettings {
            service: required(self.service.clone()),
            user: required(self.user.clone()),
            password: required(self.password.clone()),
        }))
    }

    /// Certificate policy for the SMTP transport.
    ///
    /// `isTlsRejectUnauthorized` is applied after `tls.rejectUnauthorized`,
    /// so it wins when both are set. Without either, invalid certificates are
    /// rejected.
    fn reject_unauthorized(&self) -> bool {
        let from_tls = self.tls.as_ref().and_then(|tls| tls.reject_unauthorized);
        match (from_tls, self.is_tls_reject_unauthorized) {
            (Some(tls_value), Some(fixed)) => {
                if tls_value != fixed {
                    warn!(
                        tls_reject_unauthorized = tls_value,
                        is_tls_reject_unauthorized = fixed,
                        "isTlsRejectUnauthorized overrides tls.rejectUnauthorized"
                    );
                }
                fixed
            }
            (None, Some(fixed)) => fixed,
            (Some(tls_value), None) => tls_value,
            (None, None) => true,
        }
    }

    /// Load options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> MailAdapterResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MailAdapterError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load options from `MAIL_*` environment variables.
    ///
    /// - `MAIL_SERVICE`, `MAIL_HOST`, `MAIL_PORT`, `MAIL_SECURE`, `MAIL_REQUIRE_TLS`, `MAIL_NAME`
    /// - `MAIL_USER`, `MAIL_PASSWORD`
    /// - `MAIL_AUTH_TYPE`, `MAIL_CLIENT_ID`, `MAIL_CLIENT_SECRET`, `MAIL_REFRESH_TOKEN`,
    ///   `MAIL_ACCESS_TOKEN`, `MAIL_EXPIRES`
    /// - `MAIL_FROM_ADDRESS`, `MAIL_EMAIL_FIELD`
    /// - `MAIL_BLACKLISTED_DOMAINS` (comma separated)
    /// - `MAIL_TLS_REJECT_UNAUTHORIZED`
    /// - `MAIL_RESET_PASSWORD_TEMPLATE`, `MAIL_RESET_PASSWORD_SUBJECT`,
    ///   `MAIL_VERIFY_EMAIL_TEMPLATE`, `MAIL_VERIFY_EMAIL_SUBJECT`
    /// - `MAIL_I18N_LOCALES` (comma separated), `MAIL_I18N_DEFAULT_LOCALE`, `MAIL_I18N_DIRECTORY`
    pub fn from_env() -> MailAdapterResult<Self> {
        let template = |template_key: &str, subject_key: &str| {
            env_opt(template_key).map(|template| TemplateSpec {
                template,
                subject: env_opt(subject_key),
            })
        };
        let reset_password = template("MAIL_RESET_PASSWORD_TEMPLATE", "MAIL_RESET_PASSWORD_SUBJECT");
        let verify_email = template("MAIL_VERIFY_EMAIL_TEMPLATE", "MAIL_VERIFY_EMAIL_SUBJECT");
        let templates = (reset_password.is_some() || verify_email.is_some()).then(|| TemplatesConfig {
            reset_password,
            verify_email,
        });

        let i18n_locales = env_list("MAIL_I18N_LOCALES");
        let i18n_default = env_opt("MAIL_I18N_DEFAULT_LOCALE");
        let i18n_directory = env_opt("MAIL_I18N_DIRECTORY").map(PathBuf::from);
        let i18n = (i18n_locales.is_some() || i18n_default.is_some() || i18n_directory.is_some())
            .then(|| I18nConfig {
                locales: i18n_locales.unwrap_or_default(),
                default_locale: i18n_default,
                directory: i18n_directory,
            });

        Ok(Self {
            service: env_opt("MAIL_SERVICE"),
            host: env_opt("MAIL_HOST"),
            port: env_parse("MAIL_PORT")?,
            secure: env_bool("MAIL_SECURE")?,
            require_tls: env_bool("MAIL_REQUIRE_TLS")?,
            tls: None,
            name: env_opt("MAIL_NAME"),
            user: env_opt("MAIL_USER"),
            password: env_opt("MAIL_PASSWORD"),
            auth_type: env_opt("MAIL_AUTH_TYPE"),
            client_id: env_opt("MAIL_CLIENT_ID"),
            client_secret: env_opt("MAIL_CLIENT_SECRET"),
            refresh_token: env_opt("MAIL_REFRESH_TOKEN"),
            access_token: env_opt("MAIL_ACCESS_TOKEN"),
            expires: env_parse("MAIL_EXPIRES")?,
            from_address: env_opt("MAIL_FROM_ADDRESS"),
            email_field: env_opt("MAIL_EMAIL_FIELD"),
            templates,
            blacklisted_domains: env_list("MAIL_BLACKLISTED_DOMAINS"),
            is_tls_reject_unauthorized: env_bool("MAIL_TLS_REJECT_UNAUTHORIZED")?,
            i18n,
        })
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    env_opt(key).map(|value| {
        value
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
}

fn env_bool(key: &str) -> MailAdapterResult<Option<bool>> {
    match env_opt(key) {
        None => Ok(None),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(MailAdapterError::Config(format!(
                "Failed to parse environment variable '{}': expected a boolean, got '{}'",
                key, value
            ))),
        },
    }
}

fn env_parse<T>(key: &str) -> MailAdapterResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    env_opt(key)
        .map(|value| {
            value.parse::<T>().map_err(|e| {
                MailAdapterError::Config(format!(
                    "Failed to parse environment variable '{}': {}",
                    key, e
                ))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gmail_options() -> serde_json::Value {
        json!({
            "service": "OAuth2Gmail",
            "type": "OAuth2",
            "user": "sender@gmail.com",
            "fromAddress": "sender@gmail.com",
            "clientId": "client-id",
            "clientSecret": "client-secret",
            "refreshToken": "refresh-token",
            "accessToken": "access-token",
        })
    }

    fn smtp_options() -> serde_json::Value {
        json!({
            "service": "SMTP",
            "host": "mail.example.com",
            "port": 587,
            "secure": false,
            "user": "mailer",
            "password": "secret",
            "fromAddress": "App <no-reply@example.com>",
        })
    }

    fn service_options() -> serde_json::Value {
        json!({
            "service": "SendGrid",
            "user": "apikey",
            "password": "SG.key",
            "fromAddress": "no-reply@example.com",
        })
    }

    fn without(mut value: serde_json::Value, field: &str) -> serde_json::Value {
        value.as_object_mut().unwrap().remove(field);
        value
    }

    #[test]
    fn test_null_options_are_rejected() {
        let err = AdapterConfig::from_value(serde_json::Value::Null).unwrap_err();
        assert!(matches!(err, MailAdapterError::Config(ref msg) if msg == "adapter options required"));
    }

    #[test]
    fn test_each_shape_validates() {
        let gmail = AdapterConfig::from_value(gmail_options()).unwrap();
        assert_eq!(gmail.transport.kind(), TransportKind::OAuth2Gmail);

        let smtp = AdapterConfig::from_value(smtp_options()).unwrap();
        assert_eq!(smtp.transport.kind(), TransportKind::Smtp);
        assert_eq!(smtp.from_address, "App <no-reply@example.com>");

        let service = AdapterConfig::from_value(service_options()).unwrap();
        assert_eq!(service.transport.kind(), TransportKind::Service);
    }

    #[test]
    fn test_gmail_missing_any_required_field_fails() {
        for field in [
            "type",
            "user",
            "fromAddress",
            "clientId",
            "clientSecret",
            "refreshToken",
            "accessToken",
        ] {
            let result = AdapterConfig::from_value(without(gmail_options(), field));
            match result {
                Err(MailAdapterError::Config(msg)) => {
                    assert!(msg.contains("Gmail API adapter requires"), "{}", msg);
                    assert!(msg.contains(field), "{} should name {}", msg, field);
                }
                other => panic!("expected config error for missing {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_smtp_missing_any_required_field_fails() {
        for field in ["user", "password", "host", "secure", "fromAddress"] {
            let result = AdapterConfig::from_value(without(smtp_options(), field));
            assert!(
                matches!(result, Err(MailAdapterError::Config(ref msg)) if msg.contains(field)),
                "missing {} should fail, got {:?}",
                field,
                result
            );
        }
    }

    #[test]
    fn test_service_missing_any_required_field_fails() {
        for field in ["user", "password", "service", "fromAddress"] {
            let result = AdapterConfig::from_value(without(service_options(), field));
            match result {
                Err(MailAdapterError::Config(msg)) => {
                    assert!(msg.contains("OAuth2Gmail, SMTP"), "{}", msg);
                }
                other => panic!("expected config error for missing {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_empty_from_address_is_missing() {
        let mut options = smtp_options();
        options["fromAddress"] = json!("  ");
        let err = AdapterConfig::from_value(options).unwrap_err();
        assert!(err.to_string().contains("fromAddress"));
    }

    #[test]
    fn test_empty_credentials_are_present() {
        let options = json!({
            "service": "SMTP",
            "user": "relay",
            "password": "",
            "host": "localhost",
            "secure": false,
            "fromAddress": "a@b.c",
        });
        let config = AdapterConfig::from_value(options).unwrap();
        let TransportConfig::Smtp(settings) = config.transport else {
            panic!("expected SMTP transport");
        };
        assert_eq!(settings.password, "");

        let mut service = service_options();
        service["user"] = json!("");
        assert!(AdapterConfig::from_value(service).is_ok());
    }

    #[test]
    fn test_smtp_defaults() {
        let config = AdapterConfig::from_value(smtp_options()).unwrap();
        let TransportConfig::Smtp(settings) = config.transport else {
            panic!("expected SMTP transport");
        };
        assert_eq!(settings.name, DEFAULT_CLIENT_NAME);
        assert!(settings.reject_unauthorized);
        assert!(!settings.require_tls);
        assert_eq!(settings.port, Some(587));
    }

    #[test]
    fn test_fixed_tls_policy_wins_over_tls_options() {
        let mut options = smtp_options();
        options["tls"] = json!({ "rejectUnauthorized": true, "servername": "relay.example.com" });
        options["isTlsRejectUnauthorized"] = json!(false);
        let config = AdapterConfig::from_value(options).unwrap();
        let TransportConfig::Smtp(settings) = config.transport else {
            panic!("expected SMTP transport");
        };
        assert!(!settings.reject_unauthorized);
        assert_eq!(settings.servername.as_deref(), Some("relay.example.com"));
    }

    #[test]
    fn test_tls_option_honoured_without_fixed_policy() {
        let mut options = smtp_options();
        options["tls"] = json!({ "rejectUnauthorized": false });
        let config = AdapterConfig::from_value(options).unwrap();
        let TransportConfig::Smtp(settings) = config.transport else {
            panic!("expected SMTP transport");
        };
        assert!(!settings.reject_unauthorized);
    }

    #[test]
    fn test_optional_sections_deserialize() {
        let mut options = service_options();
        options["emailField"] = json!("workEmail");
        options["blacklistedDomains"] = json!(["blocked.com", " "]);
        options["templates"] = json!({
            "resetPassword": { "template": "templates/reset", "subject": "Reset it" },
            "verifyEmail": { "template": "templates/verify" },
        });
        options["i18n"] = json!({ "locales": ["en", "fr"], "defaultLocale": "en" });

        let config = AdapterConfig::from_value(options).unwrap();
        assert_eq!(config.email_field.as_deref(), Some("workEmail"));
        assert_eq!(config.blacklisted_domains, vec!["blocked.com".to_string()]);
        assert_eq!(
            config.templates.reset_password.as_ref().unwrap().subject.as_deref(),
            Some("Reset it")
        );
        assert!(config.templates.verify_email.as_ref().unwrap().subject.is_none());
        assert!(config.is_localized());
    }

    #[test]
    fn test_from_env_reads_smtp_shape() {
        temp_env::with_vars(
            [
                ("MAIL_SERVICE", Some("SMTP")),
                ("MAIL_HOST", Some("smtp.example.com")),
                ("MAIL_PORT", Some("2525")),
                ("MAIL_SECURE", Some("false")),
                ("MAIL_USER", Some("user")),
                ("MAIL_PASSWORD", Some("pass")),
                ("MAIL_FROM_ADDRESS", Some("no-reply@example.com")),
                ("MAIL_BLACKLISTED_DOMAINS", Some("a.com, b.com")),
                ("MAIL_VERIFY_EMAIL_TEMPLATE", Some("templates/verify")),
            ],
            || {
                let options = AdapterOptions::from_env().unwrap();
                assert_eq!(options.port, Some(2525));
                assert_eq!(options.secure, Some(false));
                assert_eq!(
                    options.blacklisted_domains,
                    Some(vec!["a.com".to_string(), "b.com".to_string()])
                );
                let config = options.validate().unwrap();
                assert_eq!(config.transport.kind(), TransportKind::Smtp);
                assert!(config.templates.verify_email.is_some());
                assert!(config.templates.reset_password.is_none());
                assert!(!config.is_localized());
            },
        );
    }

    #[test]
    fn test_from_env_rejects_bad_port() {
        temp_env::with_vars([("MAIL_PORT", Some("not-a-port"))], || {
            let err = AdapterOptions::from_env().unwrap_err();
            assert!(err.to_string().contains("MAIL_PORT"));
        });
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mail.json");
        std::fs::write(&path, service_options().to_string()).unwrap();

        let options = AdapterOptions::from_json_file(&path).unwrap();
        assert_eq!(options.service.as_deref(), Some("SendGrid"));

        let missing = AdapterOptions::from_json_file(dir.path().join("absent.json"));
        assert!(matches!(missing, Err(MailAdapterError::Config(_))));
    }
}
