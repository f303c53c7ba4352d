//! Localized output selection.
//!
//! Picks the most specific variant of each output field from a rendered
//! bundle. Fields are selected independently: a bundle may carry a localized
//! `html` next to an unlocalized `text`.

use crate::templates::RenderedTemplateBundle;

/// Marker used for an html or text body the bundle does not provide.
pub const TEMPLATE_NOT_FOUND: &str = "Template file not found.";

/// An output field of a rendered template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateField {
    Html,
    Text,
    Subject,
}

impl TemplateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateField::Html => "html",
            TemplateField::Text => "text",
            TemplateField::Subject => "subject",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "html" => Some(TemplateField::Html),
            "text" => Some(TemplateField::Text),
            "subject" => Some(TemplateField::Subject),
            _ => None,
        }
    }

    /// Bundle key of this field, qualified by `locale` when given.
    pub fn key(&self, locale: Option<&str>) -> String {
        match locale {
            Some(locale) => format!("{}.{}", locale, self.as_str()),
            None => self.as_str().to_string(),
        }
    }
}

/// Most specific value of `field`: the `<locale>.<field>` entry, then the
/// bare `<field>` entry.
pub fn select_field<'a>(
    bundle: &'a RenderedTemplateBundle,
    locale: Option<&str>,
    field: TemplateField,
) -> Option<&'a str> {
    locale
        .filter(|locale| !locale.is_empty())
        .and_then(|locale| bundle.get(&field.key(Some(locale))))
        .or_else(|| bundle.get(field.as_str()))
}

/// Subject, html and text picked from a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedContent {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl LocalizedContent {
    /// Select every field, falling back to `default_subject` for the subject
    /// and to [`TEMPLATE_NOT_FOUND`] for the bodies.
    pub fn select(
        bundle: &RenderedTemplateBundle,
        locale: Option<&str>,
        default_subject: &str,
    ) -> Self {
        let body = |field| {
            select_field(bundle, locale, field)
                .unwrap_or(TEMPLATE_NOT_FOUND)
                .to_string()
        };
        Self {
            subject: select_field(bundle, locale, TemplateField::Subject)
                .unwrap_or(default_subject)
                .to_string(),
            html: body(TemplateField::Html),
            text: body(TemplateField::Text),
        }
    }
}
