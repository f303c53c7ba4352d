//! Error types for the mail adapter.

use thiserror::Error;

/// Result type for mail adapter operations.
pub type MailAdapterResult<T> = Result<T, MailAdapterError>;

/// Errors that can occur while building or using the adapter.
#[derive(Debug, Error)]
pub enum MailAdapterError {
    /// The supplied options do not satisfy any supported configuration shape.
    ///
    /// Only ever returned while constructing an adapter.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The template engine failed to produce a bundle.
    #[error("Template rendering error: {0}")]
    Template(String),

    /// The transport rejected or failed to deliver the message.
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// An operation was invoked with incomplete input.
    #[error("Usage error: {0}")]
    Usage(String),

    /// The user directory could not be queried.
    #[error("User lookup error: {0}")]
    UserLookup(String),
}

impl MailAdapterError {
    /// Short, stable name of the error class, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            MailAdapterError::Config(_) => "config",
            MailAdapterError::Template(_) => "template",
            MailAdapterError::Delivery(_) => "delivery",
            MailAdapterError::Usage(_) => "usage",
            MailAdapterError::UserLookup(_) => "user_lookup",
        }
    }
}

impl From<handlebars::RenderError> for MailAdapterError {
    fn from(err: handlebars::RenderError) -> Self {
        MailAdapterError::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for MailAdapterError {
    fn from(err: handlebars::TemplateError) -> Self {
        MailAdapterError::Template(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for MailAdapterError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        MailAdapterError::Delivery(format!("SMTP error: {}", err))
    }
}

impl From<lettre::error::Error> for MailAdapterError {
    fn from(err: lettre::error::Error) -> Self {
        MailAdapterError::Delivery(format!("Failed to build email message: {}", err))
    }
}

impl From<lettre::address::AddressError> for MailAdapterError {
    fn from(err: lettre::address::AddressError) -> Self {
        MailAdapterError::Delivery(format!("Invalid address: {}", err))
    }
}

impl From<serde_json::Error> for MailAdapterError {
    fn from(err: serde_json::Error) -> Self {
        MailAdapterError::Config(format!("Invalid JSON: {}", err))
    }
}
