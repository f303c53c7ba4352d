//! Logging and error report setup.

use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Where the CLI runs; selects the log format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Read `APP_ENV`; anything but `production` is development.
    pub fn from_env() -> Self {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Install color-eyre. Safe to call more than once.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Default filter when `RUST_LOG` is unset.
fn default_directives(environment: Environment, verbose: bool) -> &'static str {
    match (environment, verbose) {
        (_, true) => "debug",
        (Environment::Production, false) => "warn",
        (Environment::Development, false) => "info",
    }
}

/// Initialize tracing: JSON lines in production, pretty output otherwise.
///
/// `RUST_LOG` overrides the default levels. Safe to call more than once.
pub fn init_tracing(environment: Environment, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(environment, verbose)));

    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(_) => debug!(environment = ?environment, "Tracing initialized"),
        Err(_) => info!("Tracing already initialized, skipping re-initialization"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_development() {
        temp_env::with_var_unset("APP_ENV", || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
    }

    #[test]
    fn test_environment_production_is_case_insensitive() {
        temp_env::with_var("APP_ENV", Some("PRODUCTION"), || {
            assert!(Environment::from_env().is_production());
        });
    }

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives(Environment::Production, false), "warn");
        assert_eq!(default_directives(Environment::Development, false), "info");
        assert_eq!(default_directives(Environment::Production, true), "debug");
    }

    #[test]
    fn test_init_tracing_multiple_calls() {
        init_tracing(Environment::Development, false);
        init_tracing(Environment::Production, false);
    }

    #[test]
    fn test_init_tracing_with_rust_log_env() {
        temp_env::with_var("RUST_LOG", Some("domain_mail_adapter=trace"), || {
            init_tracing(Environment::Development, true);
        });
    }
}
