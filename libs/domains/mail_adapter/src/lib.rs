//! Mail Adapter Domain
//!
//! Mail delivery for the host framework's pluggable email subsystem: plain
//! sends, template sends, and the password reset and address verification
//! emails triggered by user lifecycle events.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   MailAdapter   │  ← send_mail / send_mail_with_template / lifecycle sends
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │ Locale Resolver │  ← user language, user directory, request locale, "en"
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │    Renderer     │  ← handlebars, per-locale template variants
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │    Selector     │  ← <locale>.<field>, then <field>, then defaults
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   Dispatcher    │  ← sender, domain blacklist
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │    Transport    │  ← OAuth2 Gmail, SMTP, named service
//! └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_mail_adapter::{LifecycleEmail, MailAdapter, UserRecord};
//! use serde_json::json;
//!
//! let adapter = MailAdapter::create(json!({
//!     "service": "SMTP",
//!     "host": "smtp.example.com",
//!     "secure": true,
//!     "user": "mailer",
//!     "password": "secret",
//!     "fromAddress": "App <no-reply@example.com>",
//! }))?;
//!
//! let user = UserRecord::new().with("email", "ada@example.com");
//! adapter
//!     .send_password_reset_email(LifecycleEmail::new(user, "App", "https://app/reset"))
//!     .await?;
//! ```

pub mod adapter;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod locale;
pub mod models;
pub mod recipient;
pub mod selector;
pub mod templates;
pub mod transport;
pub mod user;

// Re-export commonly used types
pub use adapter::MailAdapter;
pub use config::{AdapterConfig, AdapterOptions, I18nConfig, TemplateSpec, TemplatesConfig, TransportConfig, TransportKind};
pub use dispatcher::MailDispatcher;
pub use error::{MailAdapterError, MailAdapterResult};
pub use locale::{normalize_locale, LocaleContext, LocaleResolver, DEFAULT_LOCALE};
pub use models::{
    DeliveryInfo, LifecycleEmail, LifecycleKind, MailEnvelope, MailMessage, SentEmail, TemplatedMail,
};
pub use recipient::RecipientResolver;
pub use selector::{LocalizedContent, TemplateField, TEMPLATE_NOT_FOUND};
pub use templates::{HandlebarsRenderer, RenderOptions, RenderedTemplateBundle, TemplateRenderer};
pub use transport::{build_transport, MailTransport};
pub use user::{InMemoryUserLookup, UserLookup, UserRecord};
