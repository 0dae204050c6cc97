//! OAuth 1.0a credential bundle
//!
//! All four values are required and held as [`SecretString`] so they are
//! zeroed on drop and never printed by `Debug`.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{ConfigError, Result};

pub const ACCESS_TOKEN_VAR: &str = "ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET_VAR: &str = "ACCESS_TOKEN_SECRET";
pub const API_KEY_VAR: &str = "API_KEY";
pub const API_KEY_SECRET_VAR: &str = "API_KEY_SECRET";

pub struct Credentials {
    access_token: SecretString,
    access_token_secret: SecretString,
    api_key: SecretString,
    api_key_secret: SecretString,
}

impl Credentials {
    /// Build credentials, failing fast if any value is missing or blank
    pub fn new(
        access_token: Option<String>,
        access_token_secret: Option<String>,
        api_key: Option<String>,
        api_key_secret: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            access_token: required(ACCESS_TOKEN_VAR, access_token)?,
            access_token_secret: required(ACCESS_TOKEN_SECRET_VAR, access_token_secret)?,
            api_key: required(API_KEY_VAR, api_key)?,
            api_key_secret: required(API_KEY_SECRET_VAR, api_key_secret)?,
        })
    }

    /// Read credentials from the process environment
    pub fn from_env() -> Result<Self> {
        for var in [
            ACCESS_TOKEN_VAR,
            ACCESS_TOKEN_SECRET_VAR,
            API_KEY_VAR,
            API_KEY_SECRET_VAR,
        ] {
            tracing::debug!("{}: {}", var, if std::env::var_os(var).is_some() { "set" } else { "unset" });
        }

        Self::new(
            std::env::var(ACCESS_TOKEN_VAR).ok(),
            std::env::var(ACCESS_TOKEN_SECRET_VAR).ok(),
            std::env::var(API_KEY_VAR).ok(),
            std::env::var(API_KEY_SECRET_VAR).ok(),
        )
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    pub fn access_token_secret(&self) -> &str {
        self.access_token_secret.expose_secret()
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub fn api_key_secret(&self) -> &str {
        self.api_key_secret.expose_secret()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field("access_token_secret", &"[REDACTED]")
            .field("api_key", &"[REDACTED]")
            .field("api_key_secret", &"[REDACTED]")
            .finish()
    }
}

fn required(name: &str, value: Option<String>) -> Result<SecretString> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(SecretString::from(v)),
        _ => Err(ConfigError::MissingField(name.to_string()).into()),
    }
}
