//! Identity provider and session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Default authorization endpoint.
pub const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://www.linkedin.com/oauth/v2/authorization";

/// Default token endpoint.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://www.linkedin.com/oauth/v2/accessToken";

/// Default profile endpoint.
pub const DEFAULT_USERINFO_ENDPOINT: &str = "https://api.linkedin.com/v2/userinfo";

/// OAuth client settings for the identity provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// OAuth client id registered with the provider.
    pub client_id: String,

    /// OAuth client secret. Only the backend holds it.
    pub client_secret: Option<String>,

    /// Scope requested by the dashboard login flow.
    pub scope: String,

    /// `response_type` sent in the authorization request.
    pub response_type: String,

    /// Where the provider redirects the dashboard login flow.
    pub callback_url: String,

    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            scope: "openid email profile".to_string(),
            response_type: "code".to_string(),
            callback_url: "http://localhost:3000/auth/linkedin/callback".to_string(),
            authorization_endpoint: DEFAULT_AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            userinfo_endpoint: DEFAULT_USERINFO_ENDPOINT.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Returns the client secret if one is configured and non-empty.
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.client_secret.as_deref().filter(|s| !s.is_empty())
    }

    /// Validates the provider settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` when the client id or secret is absent
    /// and `ConfigError::InvalidValue` when an endpoint is not a URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::Missing("linkedin.client_id".to_string()));
        }
        if self.secret().is_none() {
            return Err(ConfigError::Missing("linkedin.client_secret".to_string()));
        }
        for (name, value) in [
            ("authorization_endpoint", &self.authorization_endpoint),
            ("token_endpoint", &self.token_endpoint),
            ("userinfo_endpoint", &self.userinfo_endpoint),
            ("callback_url", &self.callback_url),
        ] {
            Url::parse(value).map_err(|e| {
                ConfigError::InvalidValue(format!("{name} is not a valid URL: {e}"))
            })?;
        }
        Ok(())
    }
}

/// Server-side session settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the session cookie.
    pub cookie_name: String,

    /// Session lifetime, also used as cookie `Max-Age`.
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,

    /// Mark the cookie `Secure`.
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "pagesaver.sid".to_string(),
            max_age: Duration::from_secs(24 * 3600),
            secure: false,
        }
    }
}

impl SessionConfig {
    /// Validates the session settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cookie_name.is_empty() {
            return Err(ConfigError::InvalidValue(
                "session cookie_name cannot be empty".to_string(),
            ));
        }
        if self.max_age.is_zero() {
            return Err(ConfigError::InvalidValue(
                "session max_age must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}
