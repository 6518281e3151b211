//! Identity and credential types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The user as known to the identity provider.
///
/// Fetched once per login and replaced on the next login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// External subject id.
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
}

/// An access token together with its expiry metadata.
///
/// Each context (extension or server session) keeps its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential {
    pub access_token: String,
    /// Lifetime in seconds as declared by the provider.
    pub expires_in: u64,
    pub token_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

impl AccessCredential {
    /// Wraps a token issued now.
    #[must_use]
    pub fn issued_now(access_token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_in,
            token_type: "Bearer".to_string(),
            issued_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Token endpoint success response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Profile endpoint response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    pub sub: Option<String>,
    pub name: Option<String>,
    pub localized_first_name: Option<String>,
    pub localized_last_name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
    pub locale: Option<serde_json::Value>,
}

impl ProviderProfile {
    /// Display name, falling back to the localized first/last names.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return Some(name.to_string());
        }
        match (&self.localized_first_name, &self.localized_last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => None,
        }
    }

    /// Converts into an [`Identity`]. Returns `None` without a subject id.
    #[must_use]
    pub fn into_identity(self) -> Option<Identity> {
        let name = self.display_name();
        let id = self.sub.filter(|s| !s.is_empty())?;
        Some(Identity {
            id,
            name,
            email: self.email,
            picture: self.picture,
        })
    }
}
