//! Locale resolution for localized templates.

use crate::user::{UserLookup, UserRecord};
use std::sync::Arc;
use tracing::{debug, warn};

/// Locale used when nothing else is known.
pub const DEFAULT_LOCALE: &str = "en";

/// Map a language name to its locale code.
///
/// `english` and `french` become `en` and `fr`; anything else passes through
/// verbatim, so the mapping is idempotent.
pub fn normalize_locale(value: &str) -> String {
    match value {
        "english" => "en",
        "french" => "fr",
        other => other,
    }
    .to_string()
}

/// Inputs available for resolving a message's locale.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocaleContext<'a> {
    pub user: Option<&'a UserRecord>,
    pub locale: Option<&'a str>,
}

impl<'a> LocaleContext<'a> {
    pub fn new(user: Option<&'a UserRecord>, locale: Option<&'a str>) -> Self {
        Self { user, locale }
    }
}

/// Resolves the effective locale of a message.
#[derive(Clone, Default)]
pub struct LocaleResolver {
    lookup: Option<Arc<dyn UserLookup>>,
}

impl LocaleResolver {
    pub fn new(lookup: Option<Arc<dyn UserLookup>>) -> Self {
        Self { lookup }
    }

    /// Resolve in order: the user's language, the language of the user's full
    /// record from the directory, the request locale, then [`DEFAULT_LOCALE`].
    pub async fn resolve(&self, context: LocaleContext<'_>) -> String {
        if let Some(user) = context.user {
            if let Some(language) = user.language() {
                return normalize_locale(language);
            }
            if let Some(language) = self.lookup_language(user).await {
                return normalize_locale(&language);
            }
        }

        match context.locale.filter(|locale| !locale.is_empty()) {
            Some(locale) => normalize_locale(locale),
            None => DEFAULT_LOCALE.to_string(),
        }
    }

    async fn lookup_language(&self, user: &UserRecord) -> Option<String> {
        let lookup = self.lookup.as_ref()?;
        let email = user.email()?;

        match lookup.find_by_email(email).await {
            Ok(Some(record)) => {
                debug!(email = %email, "Loaded full user record for locale");
                record.language().map(str::to_string)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(email = %email, error = %e, "User lookup failed, falling back to request locale");
                None
            }
        }
    }
}

impl std::fmt::Debug for LocaleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleResolver")
            .field("has_lookup", &self.lookup.is_some())
            .finish()
    }
}
