//! The mail adapter: the surface a host framework calls to send mail.

use crate::config::{AdapterConfig, TemplateSpec};
use crate::dispatcher::MailDispatcher;
use crate::error::{MailAdapterError, MailAdapterResult};
use crate::locale::{LocaleContext, LocaleResolver};
use crate::models::{DeliveryInfo, LifecycleEmail, LifecycleKind, MailMessage, TemplatedMail};
use crate::recipient::RecipientResolver;
use crate::selector::LocalizedContent;
use crate::templates::{HandlebarsRenderer, RenderOptions, RenderedTemplateBundle, TemplateRenderer};
use crate::transport::{build_transport, MailTransport};
use crate::user::{UserLookup, UserRecord};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Mail adapter bound to one validated configuration and one transport.
#[derive(Clone)]
pub struct MailAdapter {
    config: Arc<AdapterConfig>,
    dispatcher: MailDispatcher,
    renderer: Arc<dyn TemplateRenderer>,
    recipients: RecipientResolver,
    locales: LocaleResolver,
}

impl MailAdapter {
    /// Validate raw options and build an adapter.
    ///
    /// Nothing is constructed when validation fails.
    pub fn create(options: Value) -> MailAdapterResult<Self> {
        let config = AdapterConfig::from_value(options).inspect_err(|e| {
            error!(error = %e, "Invalid mail adapter configuration");
        })?;
        Self::new(config)
    }

    /// Build an adapter, constructing the transport the configuration selects.
    pub fn new(config: AdapterConfig) -> MailAdapterResult<Self> {
        let transport = build_transport(&config.transport)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Build an adapter around an existing transport.
    pub fn with_transport(config: AdapterConfig, transport: Arc<dyn MailTransport>) -> Self {
        info!(
            transport = transport.name(),
            localized = config.is_localized(),
            "Mail adapter created"
        );

        Self {
            dispatcher: MailDispatcher::new(
                config.from_address.clone(),
                config.blacklisted_domains.clone(),
                transport,
            ),
            renderer: Arc::new(HandlebarsRenderer::new()),
            recipients: RecipientResolver::new(config.email_field.clone()),
            locales: LocaleResolver::default(),
            config: Arc::new(config),
        }
    }

    /// Replace the template renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Look up full user records when a user carries no language.
    pub fn with_user_lookup(mut self, lookup: Arc<dyn UserLookup>) -> Self {
        self.locales = LocaleResolver::new(Some(lookup));
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Send a message as-is.
    #[instrument(skip(self, message), fields(to = %message.to))]
    pub async fn send_mail(&self, message: MailMessage) -> MailAdapterResult<DeliveryInfo> {
        self.dispatcher.send(message).await
    }

    /// Render `template_id` with `context`.
    ///
    /// With localization configured, the locale is resolved from the
    /// context's `user` and `locale` (or `language`) entries.
    pub async fn render_template(
        &self,
        template_id: &str,
        context: &Value,
    ) -> MailAdapterResult<RenderedTemplateBundle> {
        let locale = self.context_locale(context, None).await;
        self.render(template_id, context, locale).await
    }

    /// Render `mail.template` and send the result.
    ///
    /// A subject rendered by the template replaces `mail.subject`.
    #[instrument(skip(self, mail), fields(to = %mail.to))]
    pub async fn send_mail_with_template(&self, mail: TemplatedMail) -> MailAdapterResult<DeliveryInfo> {
        let Some(template) = mail.template.clone().filter(|t| !t.is_empty()) else {
            let err = MailAdapterError::Usage("Template variable not specified".to_string());
            error!(error = %err, "Templated send without a template");
            return Err(err);
        };

        let mut context = serde_json::to_value(&mail)
            .map_err(|e| MailAdapterError::Usage(format!("Invalid template variables: {}", e)))?;
        let locale = self.context_locale(&context, mail.language.as_deref()).await;
        if let (Some(locale), Some(object)) = (&locale, context.as_object_mut()) {
            object.insert("locale".to_string(), json!(locale));
        }

        let bundle = self.render(&template, &context, locale.clone()).await?;
        let content = LocalizedContent::select(&bundle, locale.as_deref(), &mail.subject);

        self.dispatcher
            .send(
                MailMessage::new(mail.to, content.subject)
                    .with_html(content.html)
                    .with_text(content.text),
            )
            .await
    }

    /// Send the password reset email for `email.user`.
    pub async fn send_password_reset_email(&self, email: LifecycleEmail) -> MailAdapterResult<DeliveryInfo> {
        self.send_lifecycle(LifecycleKind::PasswordReset, email).await
    }

    /// Send the address verification email for `email.user`.
    pub async fn send_verification_email(&self, email: LifecycleEmail) -> MailAdapterResult<DeliveryInfo> {
        self.send_lifecycle(LifecycleKind::EmailVerification, email).await
    }

    /// Check that the transport can reach its server.
    pub async fn health_check(&self) -> MailAdapterResult<bool> {
        self.dispatcher.transport().health_check().await
    }

    /// Resolve the locale of a template context, or `None` when not localized.
    ///
    /// `requested` wins over the context's own `locale` and `language` entries.
    async fn context_locale(&self, context: &Value, requested: Option<&str>) -> Option<String> {
        if !self.config.is_localized() {
            return None;
        }

        let user = context
            .get("user")
            .and_then(Value::as_object)
            .map(|attributes| UserRecord::from(attributes.clone()));
        let requested = requested.filter(|r| !r.is_empty()).or_else(|| {
            context
                .get("locale")
                .or_else(|| context.get("language"))
                .and_then(Value::as_str)
        });

        Some(self.locales.resolve(LocaleContext::new(user.as_ref(), requested)).await)
    }

    fn template_for(&self, kind: LifecycleKind) -> Option<&TemplateSpec> {
        match kind {
            LifecycleKind::PasswordReset => self.config.templates.reset_password.as_ref(),
            LifecycleKind::EmailVerification => self.config.templates.verify_email.as_ref(),
        }
    }

    #[instrument(skip(self, email), fields(kind = %kind))]
    async fn send_lifecycle(&self, kind: LifecycleKind, email: LifecycleEmail) -> MailAdapterResult<DeliveryInfo> {
        let to = self.recipients.resolve(&email.user).unwrap_or_default().to_string();

        let Some(spec) = self.template_for(kind) else {
            debug!(to = %to, "No template configured, sending the link as plain text");
            let message = MailMessage::new(to, kind.default_subject()).with_text(email.link);
            return self.dispatcher.send(message).await;
        };

        let locale = if self.config.is_localized() {
            Some(
                self.locales
                    .resolve(LocaleContext::new(Some(&email.user), email.locale.as_deref()))
                    .await,
            )
        } else {
            None
        };

        let context = json!({
            "appName": email.app_name,
            "link": email.link,
            "user": email.user,
            "locale": locale,
        });

        let bundle = self.render(&spec.template, &context, locale.clone()).await?;
        let default_subject = spec.subject.as_deref().unwrap_or(kind.default_subject());
        let content = LocalizedContent::select(&bundle, locale.as_deref(), default_subject);

        self.dispatcher
            .send(
                MailMessage::new(to, content.subject)
                    .with_html(content.html)
                    .with_text(content.text),
            )
            .await
    }

    async fn render(
        &self,
        template_id: &str,
        context: &Value,
        locale: Option<String>,
    ) -> MailAdapterResult<RenderedTemplateBundle> {
        let options = RenderOptions::localized(locale, self.config.i18n.clone());

        debug!(
            template = %template_id,
            renderer = self.renderer.name(),
            locale = ?options.locale,
            "Rendering template"
        );

        self.renderer
            .render(template_id, context, &options)
            .await
            .map_err(|e| {
                error!(template = %template_id, error = %e, "Template rendering failed");
                match e {
                    MailAdapterError::Template(_) => e,
                    other => MailAdapterError::Template(other.to_string()),
                }
            })
    }
}

impl std::fmt::Debug for MailAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailAdapter")
            .field("transport", &self.config.transport.kind())
            .field("dispatcher", &self.dispatcher)
            .field("renderer", &self.renderer.name())
            .field("recipients", &self.recipients)
            .field("locales", &self.locales)
            .finish()
    }
}
