//! Recipient address resolution.

use crate::user::UserRecord;

/// Picks the destination address out of a user record.
///
/// Priority: the configured `emailField` attribute, then `email`, then
/// `username`. Addresses are not validated here.
#[derive(Debug, Clone, Default)]
pub struct RecipientResolver {
    email_field: Option<String>,
}

impl RecipientResolver {
    pub fn new(email_field: Option<String>) -> Self {
        Self { email_field }
    }

    pub fn resolve<'a>(&self, user: &'a UserRecord) -> Option<&'a str> {
        self.email_field
            .as_deref()
            .and_then(|field| user.get_str(field))
            .or_else(|| user.email())
            .or_else(|| user.username())
    }
}
