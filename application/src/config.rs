//! [`Config`]-related definitions.

use std::{path::PathBuf, time};

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use service::crypto::{self, PasswordHasher, TokenCodec};
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: Server,

    /// Session configuration.
    #[serde(default)]
    pub session: Session,

    /// Password hashing configuration.
    #[serde(default)]
    pub password: Password,

    /// Uploaded files configuration.
    #[serde(default)]
    pub uploads: Uploads,

    /// Route gate configuration.
    #[serde(default)]
    pub gate: Gate,

    /// Pages server configuration.
    ///
    /// Pages are not served if omitted.
    #[serde(default)]
    pub pages: Option<Pages>,

    /// Postgres configuration.
    #[serde(default)]
    pub postgres: Postgres,

    /// Log configuration.
    #[serde(default)]
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }

    /// Builds the [`service::Config`] out of this [`Config`].
    ///
    /// # Errors
    ///
    /// If the password hashing cost, the session secret or its TTL is
    /// invalid.
    pub fn service(&self) -> Result<service::Config, crypto::ConfigError> {
        Ok(service::Config {
            password_hasher: PasswordHasher::new(self.password.cost)?,
            token_codec: TokenCodec::new(&self.session.secret, self.session.ttl)?,
        })
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(3001)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    ///
    /// Credentialed requests require explicit origins, so no wildcard here.
    #[default(vec!["http://localhost:3000".to_owned()])]
    pub origins: Vec<String>,
}

/// Session configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Session {
    /// [JWT] signing secret.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default(SecretString::from(Session::DEFAULT_SECRET))]
    pub secret: SecretString,

    /// Lifetime of the issued sessions.
    #[default(TokenCodec::DEFAULT_TTL)]
    #[serde(with = "humantime_serde")]
    pub ttl: time::Duration,

    /// Session cookie configuration.
    pub cookie: Cookie,
}

impl Session {
    /// Signing secret used when none is configured.
    ///
    /// Anyone knowing it can forge sessions.
    pub const DEFAULT_SECRET: &'static str = "secret";

    /// Indicates whether the [`Session::secret`] is the publicly known
    /// [`Session::DEFAULT_SECRET`].
    #[must_use]
    pub fn has_default_secret(&self) -> bool {
        self.secret.expose_secret() == Self::DEFAULT_SECRET
    }
}

/// Session cookie configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cookie {
    /// Domain the cookie is pinned to.
    #[default(Some("localhost".to_owned()))]
    pub domain: Option<String>,

    /// Whether the cookie is sent over HTTPS only.
    ///
    /// Must be enabled in any real deployment.
    pub secure: bool,
}

/// Password hashing configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Password {
    /// Work factor of password hashes.
    #[default(PasswordHasher::DEFAULT_COST)]
    pub cost: u32,
}

/// Uploaded files configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Uploads {
    /// Directory the uploaded files are stored in.
    #[default(PathBuf::from("uploads"))]
    pub directory: PathBuf,

    /// Maximum size of a single uploaded file, in bytes.
    #[default(5 * 1024 * 1024)]
    pub max_size: usize,
}

/// Route gate configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Gate {
    /// Path prefixes available to unauthenticated clients only.
    #[default(vec!["/login".to_owned(), "/register".to_owned()])]
    pub auth_only: Vec<String>,

    /// Path prefixes available to authenticated clients only.
    #[default(vec!["/dashboard".to_owned(), "/products".to_owned()])]
    pub protected: Vec<String>,

    /// Path prefixes never gated.
    #[default(vec![
        "/api".to_owned(),
        "/_next/static".to_owned(),
        "/_next/image".to_owned(),
        "/favicon.ico".to_owned(),
    ])]
    pub excluded: Vec<String>,

    /// Path of the login page.
    #[default("/login".to_owned())]
    pub login: String,

    /// Path authenticated clients land on.
    #[default("/dashboard".to_owned())]
    pub landing: String,
}

/// Pages server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Pages {
    /// Port to bind the pages server to.
    #[default(3000)]
    pub port: u16,

    /// Directory with the pages to serve.
    #[default(PathBuf::from("public"))]
    pub directory: PathBuf,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("inventory".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::Config;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();

        assert_eq!(config.session.ttl, Duration::from_secs(24 * 60 * 60));
        assert_eq!(config.uploads.max_size, 5 * 1024 * 1024);
        assert!(!config.session.cookie.secure);
        assert!(config.pages.is_none());
        assert!(config.service().is_ok());
    }

    #[test]
    fn rejects_invalid_service_config() {
        let mut config = Config::default();
        config.password.cost = 2;
        assert!(config.service().is_err());

        let mut config = Config::default();
        config.session.ttl = Duration::ZERO;
        assert!(config.service().is_err());
    }

    #[test]
    fn detects_default_secret() {
        let mut config = Config::default();
        assert!(config.session.has_default_secret());

        config.session.secret = SecretString::from("an0ther-s3cr3t");
        assert!(!config.session.has_default_secret());
    }
}
