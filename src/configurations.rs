//! src/configurations.rs

use crate::dispatch::DispatchMode;
use crate::email_client::EmailClient;
use crate::routes::LeadMagnetKind;
use crate::templates::{RenderStrategy, Theme};
use crate::turnstile::TurnstileClient;
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::path::PathBuf;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub email_client: EmailClientSettings,
    pub email: EmailSettings,
    pub turnstile: TurnstileSettings,
    pub lead_magnet: LeadMagnetSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub base_url: String,
    pub name: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(self.password.expose_secret())
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub api_key: Secret<String>,
    pub sending_domain: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl EmailClientSettings {
    /// `app_name` is used for the default `from` address.
    pub fn client(self, app_name: &str) -> EmailClient {
        let default_sender = format!("{} <no-reply@{}>", app_name, self.sending_domain);
        // Read before the fields below are moved out of `self`.
        let timeout = self.timeout();
        EmailClient::new(self.base_url, default_sender, self.api_key, timeout)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailSettings {
    pub default_theme: Theme,
    pub render_strategy: RenderStrategy,
    pub generated_dir: PathBuf,
    pub dispatch: DispatchMode,
}

#[derive(serde::Deserialize, Clone)]
pub struct TurnstileSettings {
    pub base_url: String,
    pub secret_key: Option<Secret<String>>,
    pub site_key: String,
}

impl TurnstileSettings {
    pub fn client(self, timeout: std::time::Duration) -> TurnstileClient {
        TurnstileClient::new(self.base_url, self.secret_key, timeout)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct LeadMagnetSettings {
    pub title: String,
    pub description: String,
    pub content_title: String,
    pub download_url: String,
    pub cover_image_url: Option<String>,
    pub kind: LeadMagnetKind,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT.");
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // APP_APPLICATION__PORT=5001 would set `Settings.application.port`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
