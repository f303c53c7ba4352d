//! Mailer CLI
//!
//! Wires the mail adapter to a JSON config file or `MAIL_*` environment
//! variables and exposes each adapter operation as a subcommand.

pub mod telemetry;

use clap::{Parser, Subcommand};
use domain_mail_adapter::{
    AdapterOptions, DeliveryInfo, HandlebarsRenderer, InMemoryUserLookup, LifecycleEmail,
    MailAdapter, MailMessage, TemplatedMail, UserRecord,
};
use eyre::{bail, eyre, Result, WrapErr};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use telemetry::{init_tracing, install_color_eyre, Environment};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mailer")]
#[command(about = "Send mail through the configured mail adapter")]
pub struct Cli {
    /// Adapter options as a JSON file. Defaults to MAIL_* environment variables.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory template ids are resolved against
    #[arg(short, long, global = true)]
    pub templates_dir: Option<PathBuf>,

    /// JSON array of user records consulted for locales
    #[arg(short, long, global = true)]
    pub users: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the configuration and show the selected transport
    Check {
        /// Also connect to the mail server
        #[arg(long)]
        connect: bool,
    },

    /// Send a plain message
    Send {
        #[arg(long)]
        to: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        html: Option<String>,
        #[arg(long)]
        text: Option<String>,
    },

    /// Render a template and print the bundle as JSON
    Render {
        /// Template id
        template: String,
        /// Template context as a JSON object
        #[arg(long, default_value = "{}")]
        context: String,
    },

    /// Render a template and send the result
    SendTemplate {
        #[arg(long)]
        to: String,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long)]
        template: String,
        #[arg(long)]
        language: Option<String>,
        /// Template variable as key=value (repeatable)
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// Send the password reset email
    ResetPassword(LifecycleArgs),

    /// Send the address verification email
    VerifyEmail(LifecycleArgs),
}

#[derive(clap::Args, Debug)]
pub struct LifecycleArgs {
    /// User record as a JSON object
    #[arg(long, conflicts_with = "email")]
    pub user: Option<String>,
    /// Recipient address, used when no user record is given
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long, default_value = "")]
    pub app_name: String,
    #[arg(long)]
    pub link: String,
    /// Request locale, used when the user has no language
    #[arg(long)]
    pub locale: Option<String>,
}

impl LifecycleArgs {
    fn into_email(self) -> Result<LifecycleEmail> {
        let user = match (self.user, self.email) {
            (Some(raw), _) => parse_object(&raw)
                .map(UserRecord::from)
                .wrap_err("Invalid --user")?,
            (None, Some(email)) => UserRecord::new().with("email", email),
            (None, None) => bail!("Either --user or --email is required"),
        };

        let mut email = LifecycleEmail::new(user, self.app_name, self.link);
        if let Some(locale) = self.locale {
            email = email.with_locale(locale);
        }
        Ok(email)
    }
}

/// Parse a `key=value` template variable.
pub fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

fn parse_object(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).wrap_err("Invalid JSON")? {
        Value::Object(map) => Ok(map),
        other => Err(eyre!("Expected a JSON object, got {}", other)),
    }
}

/// Load adapter options from `path`, or from the environment without one.
pub fn load_options(path: Option<&Path>) -> Result<AdapterOptions> {
    let options = match path {
        Some(path) => AdapterOptions::from_json_file(path)
            .wrap_err_with(|| format!("Failed to load {}", path.display()))?,
        None => AdapterOptions::from_env().wrap_err("Failed to load MAIL_* environment")?,
    };
    Ok(options)
}

async fn load_users(path: &Path) -> Result<InMemoryUserLookup> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    let users: Vec<UserRecord> =
        serde_json::from_str(&raw).wrap_err_with(|| format!("Invalid users file {}", path.display()))?;
    Ok(InMemoryUserLookup::with_users(users))
}

/// Build the adapter described by the global options.
pub async fn build_adapter(cli: &Cli) -> Result<MailAdapter> {
    let config = load_options(cli.config.as_deref())?
        .validate()
        .wrap_err("Invalid mail adapter configuration")?;

    let mut adapter = MailAdapter::new(config).wrap_err("Failed to build mail transport")?;

    if let Some(dir) = &cli.templates_dir {
        adapter = adapter.with_renderer(Arc::new(HandlebarsRenderer::new().with_base_dir(dir)));
    }
    if let Some(path) = &cli.users {
        adapter = adapter.with_user_lookup(Arc::new(load_users(path).await?));
    }
    Ok(adapter)
}

fn report(info: &DeliveryInfo) {
    match info {
        DeliveryInfo::Sent(sent) => {
            info!(message_id = ?sent.message_id, "Mail sent");
            println!("{}", info);
        }
        DeliveryInfo::Skipped { reason } => {
            info!(reason = %reason, "Mail skipped");
            println!("{}", info);
        }
    }
}

/// Run the CLI.
pub async fn run() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    init_tracing(Environment::from_env(), cli.verbose);

    let adapter = build_adapter(&cli).await?;

    match cli.command {
        Commands::Check { connect } => {
            let config = adapter.config();
            println!("transport: {}", config.transport.kind());
            println!("from: {}", config.from_address);
            println!("localized: {}", config.is_localized());
            if connect {
                adapter
                    .health_check()
                    .await
                    .wrap_err("Mail server check failed")?;
                println!("connection: ok");
            }
        }
        Commands::Send { to, subject, html, text } => {
            let mut message = MailMessage::new(to, subject);
            message.html = html;
            message.text = text;
            report(&adapter.send_mail(message).await?);
        }
        Commands::Render { template, context } => {
            let context = Value::Object(parse_object(&context).wrap_err("Invalid --context")?);
            let bundle = adapter.render_template(&template, &context).await?;
            println!("{}", serde_json::to_string_pretty(&bundle)?);
        }
        Commands::SendTemplate {
            to,
            subject,
            template,
            language,
            vars,
        } => {
            let mut mail = TemplatedMail::new(to, subject, template);
            mail.language = language;
            for (key, value) in vars {
                mail = mail.with_var(key, value);
            }
            report(&adapter.send_mail_with_template(mail).await?);
        }
        Commands::ResetPassword(args) => {
            report(&adapter.send_password_reset_email(args.into_email()?).await?);
        }
        Commands::VerifyEmail(args) => {
            report(&adapter.send_verification_email(args.into_email()?).await?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_mail_adapter::UserLookup;

    #[test]
    fn test_parse_var() {
        assert_eq!(parse_var("name=Ada"), Ok(("name".to_string(), "Ada".to_string())));
        assert_eq!(parse_var("eq=a=b"), Ok(("eq".to_string(), "a=b".to_string())));
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }

    #[test]
    fn test_parses_send_template_command() {
        let cli = Cli::try_parse_from([
            "mailer",
            "--config",
            "mail.json",
            "send-template",
            "--to",
            "a@x.com",
            "--template",
            "welcome",
            "--var",
            "name=Ada",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some(Path::new("mail.json")));
        match cli.command {
            Commands::SendTemplate { template, vars, subject, .. } => {
                assert_eq!(template, "welcome");
                assert_eq!(subject, "");
                assert_eq!(vars, vec![("name".to_string(), "Ada".to_string())]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_lifecycle_args_from_email() {
        let cli = Cli::try_parse_from([
            "mailer",
            "reset-password",
            "--email",
            "a@x.com",
            "--link",
            "http://reset",
            "--locale",
            "fr",
        ])
        .unwrap();
        let Commands::ResetPassword(args) = cli.command else {
            panic!("expected reset-password");
        };

        let email = args.into_email().unwrap();
        assert_eq!(email.user.email(), Some("a@x.com"));
        assert_eq!(email.link, "http://reset");
        assert_eq!(email.locale.as_deref(), Some("fr"));
    }

    #[test]
    fn test_lifecycle_args_from_user_json() {
        let args = LifecycleArgs {
            user: Some(r#"{"username": "ada@x.com", "language": "french"}"#.to_string()),
            email: None,
            app_name: "App".to_string(),
            link: "http://verify".to_string(),
            locale: None,
        };
        let email = args.into_email().unwrap();
        assert_eq!(email.user.username(), Some("ada@x.com"));
        assert_eq!(email.user.language(), Some("french"));
    }

    #[test]
    fn test_lifecycle_args_require_a_user() {
        let args = LifecycleArgs {
            user: None,
            email: None,
            app_name: String::new(),
            link: "http://verify".to_string(),
            locale: None,
        };
        assert!(args.into_email().is_err());

        let args = LifecycleArgs {
            user: Some("[1, 2]".to_string()),
            email: None,
            app_name: String::new(),
            link: "http://verify".to_string(),
            locale: None,
        };
        assert!(args.into_email().is_err());
    }

    #[test]
    fn test_load_options_from_env() {
        temp_env::with_vars(
            [
                ("MAIL_SERVICE", Some("SendGrid")),
                ("MAIL_USER", Some("apikey")),
                ("MAIL_PASSWORD", Some("key")),
                ("MAIL_FROM_ADDRESS", Some("no-reply@example.com")),
            ],
            || {
                let options = load_options(None).unwrap();
                assert_eq!(options.service.as_deref(), Some("SendGrid"));
                assert!(options.validate().is_ok());
            },
        );
    }

    #[test]
    fn test_load_options_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_options(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }

    #[tokio::test]
    async fn test_load_users_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, r#"[{"email": "a@x.com", "language": "french"}]"#).unwrap();

        let lookup = load_users(&path).await.unwrap();
        let user = lookup.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(user.language(), Some("french"));
    }
}
