//! Handlebars-backed template renderer.
//!
//! A template id names a directory. Each `<field>.hbs` file in it
//! (`html.hbs`, `text.hbs`, `subject.hbs`) renders into the bundle key
//! `<field>`, and each `<locale>.<field>.hbs` file into `<locale>.<field>`.

use super::{RenderOptions, RenderedTemplateBundle, TemplateRenderer};
use crate::config::I18nConfig;
use crate::error::{MailAdapterError, MailAdapterResult};
use crate::selector::TemplateField;
use async_trait::async_trait;
use handlebars::Handlebars;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

const TEMPLATE_EXTENSION: &str = ".hbs";

/// A template file found in a template directory.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TemplateSource {
    locale: Option<String>,
    field: TemplateField,
    path: PathBuf,
}

impl TemplateSource {
    /// Parse `html.hbs` or `fr.html.hbs` style file names.
    fn from_file_name(dir: &Path, file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(TEMPLATE_EXTENSION)?;
        let (locale, field) = match stem.rsplit_once('.') {
            Some((locale, field)) if !locale.is_empty() => (Some(locale.to_string()), field),
            Some(_) => return None,
            None => (None, stem),
        };
        Some(Self {
            locale,
            field: TemplateField::parse(field)?,
            path: dir.join(file_name),
        })
    }

    fn bundle_key(&self) -> String {
        self.field.key(self.locale.as_deref())
    }
}

/// Template renderer for on-disk Handlebars templates.
#[derive(Clone)]
pub struct HandlebarsRenderer {
    html: Arc<Handlebars<'static>>,
    plain: Arc<Handlebars<'static>>,
    base_dir: Option<PathBuf>,
}

impl HandlebarsRenderer {
    /// Create a renderer resolving template ids as given.
    ///
    /// HTML outputs are escaped, text and subject outputs are not.
    pub fn new() -> Self {
        let html = Handlebars::new();
        let mut plain = Handlebars::new();
        plain.register_escape_fn(handlebars::no_escape);
        Self {
            html: Arc::new(html),
            plain: Arc::new(plain),
            base_dir: None,
        }
    }

    /// Builder method to resolve relative template ids against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn template_dir(&self, template_id: &str) -> PathBuf {
        let path = PathBuf::from(template_id);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }

    /// List the template files of a template directory, sorted by bundle key.
    async fn collect_sources(&self, dir: &Path) -> MailAdapterResult<Vec<TemplateSource>> {
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
            MailAdapterError::Template(format!(
                "Template directory {} not found: {}",
                dir.display(),
                e
            ))
        })?;

        let mut sources = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            MailAdapterError::Template(format!("Failed to read {}: {}", dir.display(), e))
        })? {
            let file_name = entry.file_name();
            if let Some(source) = file_name
                .to_str()
                .and_then(|name| TemplateSource::from_file_name(dir, name))
            {
                sources.push(source);
            }
        }

        if sources.is_empty() {
            return Err(MailAdapterError::Template(format!(
                "No templates found in {}",
                dir.display()
            )));
        }

        sources.sort_by_key(TemplateSource::bundle_key);
        Ok(sources)
    }

    /// Load `<directory>/<locale>.json` translations. Missing files yield `None`.
    async fn load_translations(
        i18n: &I18nConfig,
        locale: &str,
    ) -> MailAdapterResult<Option<Value>> {
        let Some(directory) = &i18n.directory else {
            return Ok(None);
        };
        let path = directory.join(format!("{}.json", locale));
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No translations for locale");
                return Ok(None);
            }
            Err(e) => {
                return Err(MailAdapterError::Template(format!(
                    "Failed to read translations {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        let translations = serde_json::from_str(&raw).map_err(|e| {
            MailAdapterError::Template(format!(
                "Invalid translations file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Some(translations))
    }

    fn render_source(&self, source: &TemplateSource, raw: &str, data: &Value) -> MailAdapterResult<String> {
        let engine = match source.field {
            TemplateField::Html => &self.html,
            TemplateField::Text | TemplateField::Subject => &self.plain,
        };
        let rendered = engine.render_template(raw, data).map_err(|e| {
            error!(template = %source.path.display(), error = %e, "Failed to render template");
            MailAdapterError::Template(format!("{}: {}", source.path.display(), e))
        })?;

        Ok(match source.field {
            TemplateField::Subject => rendered.trim().to_string(),
            TemplateField::Html | TemplateField::Text => rendered,
        })
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Template data: the caller's context plus `locale` and, when loaded, `t`.
fn template_data(context: &Value, locale: Option<&str>, translations: Option<&Value>) -> Value {
    let mut data = match context {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other.clone());
            map
        }
    };
    if let Some(locale) = locale {
        data.insert("locale".to_string(), Value::String(locale.to_string()));
    }
    if let Some(translations) = translations {
        data.insert("t".to_string(), translations.clone());
    }
    Value::Object(data)
}

#[async_trait]
impl TemplateRenderer for HandlebarsRenderer {
    async fn render(
        &self,
        template_id: &str,
        context: &Value,
        options: &RenderOptions,
    ) -> MailAdapterResult<RenderedTemplateBundle> {
        let dir = self.template_dir(template_id);
        let sources = self.collect_sources(&dir).await?;

        debug!(
            template = %dir.display(),
            files = sources.len(),
            locale = ?options.effective_locale(),
            "Rendering template"
        );

        let mut translations: HashMap<String, Option<Value>> = HashMap::new();
        let mut bundle = RenderedTemplateBundle::new();

        for source in &sources {
            if let (Some(locale), Some(i18n)) = (&source.locale, &options.i18n) {
                if !i18n.locales.is_empty() && !i18n.locales.contains(locale) {
                    continue;
                }
            }

            let locale = source.locale.as_deref().or_else(|| options.effective_locale());
            let loaded = match (locale, &options.i18n) {
                (Some(locale), Some(i18n)) => {
                    if !translations.contains_key(locale) {
                        let value = Self::load_translations(i18n, locale).await?;
                        translations.insert(locale.to_string(), value);
                    }
                    translations.get(locale).and_then(Option::as_ref)
                }
                _ => None,
            };

            let raw = tokio::fs::read_to_string(&source.path).await.map_err(|e| {
                MailAdapterError::Template(format!(
                    "Failed to read {}: {}",
                    source.path.display(),
                    e
                ))
            })?;
            let data = template_data(context, locale, loaded);
            bundle.insert(source.bundle_key(), self.render_source(source, &raw, &data)?);
        }

        Ok(bundle)
    }

    fn name(&self) -> &'static str {
        "Handlebars"
    }
}
