//! # configs
//!
//! Layered runtime settings for forum-board. Sources, later ones winning:
//! built-in defaults, `config/default.toml`, `config/local.toml`, then
//! `FORUM__SECTION__KEY` environment variables (a `.env` file is read first).

use std::path::Path;

use config::{Config, ConfigBuilder, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "FORUM";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory served under `/static`
    pub static_dir: String,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub cookie_name: String,
    /// Send the cookie over HTTPS only
    pub secure: bool,
    pub inactivity_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeSettings {
    /// Install the light/dark/blue/green presets at startup
    pub install_builtin: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSettings {
    pub admin_username: String,
    #[serde(default)]
    pub admin_password: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub logging: LoggingSettings,
    pub themes: ThemeSettings,
    pub seed: SeedSettings,
}

impl Settings {
    /// Loads `.env`, then every layer rooted at `./config`.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env"),
        }
        Self::load_from(Path::new("config"), ENV_PREFIX)
    }

    pub fn load_from(config_dir: &Path, env_prefix: &str) -> Result<Self, ConfigError> {
        let settings: Settings = defaults()?
            .add_source(File::from(config_dir.join("default")).required(false))
            .add_source(File::from(config_dir.join("local")).required(false))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url must be set".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be at least 1".into()));
        }
        if self.session.inactivity_minutes <= 0 {
            return Err(ConfigError::Invalid("session.inactivity_minutes must be positive".into()));
        }
        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::Invalid("session.cookie_name must be set".into()));
        }
        Ok(())
    }
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8000)?
        .set_default("server.static_dir", "static")?
        .set_default("database.url", "sqlite://forum.db")?
        .set_default("database.max_connections", 5)?
        .set_default("session.cookie_name", "forum_session")?
        .set_default("session.secure", false)?
        .set_default("session.inactivity_minutes", 60 * 24 * 14)?
        .set_default("logging.filter", "info,sqlx=warn")?
        .set_default("logging.json", false)?
        .set_default("themes.install_builtin", true)?
        .set_default("seed.admin_username", "admin")
}
