//! Broker connection settings.

use std::env;
use std::fmt;

use serde::Deserialize;

use crate::error::BusError;

const DEFAULT_URL: &str = "amqp://localhost:5672/";
const DEFAULT_USERNAME: &str = "guest";
const DEFAULT_PASSWORD: &str = "guest";

/// Where and as whom to connect to the broker.
///
/// Loaded once at startup and never mutated.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionSettings {
    pub url: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}

fn default_password() -> String {
    DEFAULT_PASSWORD.to_string()
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: default_username(),
            password: default_password(),
        }
    }
}

impl ConnectionSettings {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read settings from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `RABBIT_URL`: broker URL (default: amqp://localhost:5672/)
    /// - `RABBIT_USERNAME`: user name (default: guest)
    /// - `RABBIT_PASSWORD`: password (default: guest)
    pub fn from_env() -> Self {
        Self {
            url: env::var("RABBIT_URL").unwrap_or_else(|_| DEFAULT_URL.to_string()),
            username: env::var("RABBIT_USERNAME").unwrap_or_else(|_| default_username()),
            password: env::var("RABBIT_PASSWORD").unwrap_or_else(|_| default_password()),
        }
    }

    /// Parse settings from a TOML document with `url`, `username` and
    /// `password` keys. A `[rabbit]` table is accepted as well.
    pub fn from_toml_str(source: &str) -> Result<Self, BusError> {
        #[derive(Deserialize)]
        struct Wrapped {
            rabbit: ConnectionSettings,
        }

        let settings = match toml::from_str::<Wrapped>(source) {
            Ok(wrapped) => wrapped.rabbit,
            Err(_) => toml::from_str::<ConnectionSettings>(source)
                .map_err(|e| BusError::invalid(format!("connection settings: {}", e)))?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings no transport could connect with.
    pub fn validate(&self) -> Result<(), BusError> {
        if self.url.trim().is_empty() {
            return Err(BusError::invalid("broker url must not be empty"));
        }
        match self.url.split_once("://") {
            Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => Ok(()),
            _ => Err(BusError::invalid(format!(
                "broker url must look like scheme://host: {}",
                self.url
            ))),
        }
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
