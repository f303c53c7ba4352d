//! Email template rendering.
//!
//! A renderer turns a template id plus a context object into a
//! [`RenderedTemplateBundle`]: a flat map from output keys (`html`, `text`,
//! `subject`, or locale-qualified keys such as `fr.html`) to rendered strings.

mod engine;

pub use engine::HandlebarsRenderer;

use crate::config::I18nConfig;
use crate::error::MailAdapterResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rendered template outputs keyed by field name and optional locale prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderedTemplateBundle {
    entries: BTreeMap<String, String>,
}

impl RenderedTemplateBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RenderedTemplateBundle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Per-call rendering settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Resolved locale of the message, if localization is enabled.
    pub locale: Option<String>,
    /// Localization settings of the adapter.
    pub i18n: Option<I18nConfig>,
}

impl RenderOptions {
    pub fn localized(locale: Option<String>, i18n: Option<I18nConfig>) -> Self {
        Self { locale, i18n }
    }

    /// Locale exposed to templates: the resolved one, else the configured default.
    pub fn effective_locale(&self) -> Option<&str> {
        self.locale.as_deref().or_else(|| {
            self.i18n
                .as_ref()
                .and_then(|i18n| i18n.default_locale.as_deref())
        })
    }
}

/// Template rendering engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    /// Render every output of `template_id` with `context`.
    async fn render(
        &self,
        template_id: &str,
        context: &serde_json::Value,
        options: &RenderOptions,
    ) -> MailAdapterResult<RenderedTemplateBundle>;

    /// Get the renderer name for logging.
    fn name(&self) -> &'static str;
}
