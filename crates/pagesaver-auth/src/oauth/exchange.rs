//! Token Exchange Client.
//!
//! Exchanges an authorization code at the provider's token endpoint, then
//! fetches the profile with the new token. The client secret never leaves
//! this component.

use reqwest::Client;

use crate::config::ProviderConfig;
use crate::error::BridgeError;
use crate::identity::{AccessCredential, Identity, ProviderProfile, TokenResponse};

/// Result of a successful code exchange.
///
/// The credential is always present. The profile is best-effort: if it
/// failed, `profile` holds [`BridgeError::ProfileFetchFailed`] and the token
/// is still usable.
#[derive(Debug)]
pub struct ExchangeOutcome {
    pub credential: AccessCredential,
    pub profile: Result<Identity, BridgeError>,
}

impl ExchangeOutcome {
    /// The fetched identity, if the profile call succeeded.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.profile.as_ref().ok()
    }
}

/// HTTP client for the provider's token and profile endpoints.
#[derive(Debug, Clone)]
pub struct TokenExchangeClient {
    http: Client,
    token_endpoint: String,
    userinfo_endpoint: String,
    client_secret: Option<String>,
}

impl TokenExchangeClient {
    /// Creates a client from provider settings.
    #[must_use]
    pub fn new(config: &ProviderConfig) -> Self {
        Self::with_http_client(config, Client::new())
    }

    /// Creates a client reusing an existing `reqwest::Client`.
    #[must_use]
    pub fn with_http_client(config: &ProviderConfig, http: Client) -> Self {
        Self {
            http,
            token_endpoint: config.token_endpoint.clone(),
            userinfo_endpoint: config.userinfo_endpoint.clone(),
            client_secret: config.secret().map(str::to_owned),
        }
    }

    /// Returns `true` if a client secret is configured.
    #[must_use]
    pub fn has_secret(&self) -> bool {
        self.client_secret.is_some()
    }

    /// Exchanges `code` and then fetches the profile.
    ///
    /// # Errors
    ///
    /// Fails only if the exchange itself fails. See
    /// [`exchange_code`](Self::exchange_code).
    pub async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
        client_id: &str,
    ) -> Result<ExchangeOutcome, BridgeError> {
        let credential = self.exchange_code(code, redirect_uri, client_id).await?;
        let profile = self.fetch_profile(&credential.access_token).await;
        if let Err(ref e) = profile {
            tracing::warn!(error = %e, "Profile fetch failed; keeping access token");
        }
        Ok(ExchangeOutcome {
            credential,
            profile,
        })
    }

    /// Performs the single token exchange call.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Configuration`] if no client secret is configured
    /// - [`BridgeError::ExchangeFailed`] on any non-2xx answer, carrying the
    ///   status and raw body
    /// - [`BridgeError::Network`] on transport failure
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        client_id: &str,
    ) -> Result<AccessCredential, BridgeError> {
        let secret = self
            .client_secret
            .as_deref()
            .ok_or_else(|| BridgeError::configuration("client secret not set"))?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", client_id),
            ("client_secret", secret),
        ];

        tracing::debug!(
            endpoint = %self.token_endpoint,
            redirect_uri,
            client_id,
            "Exchanging authorization code"
        );

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status, body = %body, "Token exchange rejected by provider");
            return Err(BridgeError::exchange_failed(status, body));
        }

        let token: TokenResponse = response.json().await?;
        tracing::info!(expires_in = token.expires_in, "Token exchange successful");

        Ok(AccessCredential {
            token_type: token.token_type.unwrap_or_else(|| "Bearer".to_string()),
            ..AccessCredential::issued_now(token.access_token, token.expires_in)
        })
    }

    /// Fetches the profile for `access_token`.
    ///
    /// Also used to validate bearer tokens presented to the backend.
    ///
    /// # Errors
    ///
    /// Every failure, including transport errors and a profile without a
    /// subject id, is reported as [`BridgeError::ProfileFetchFailed`].
    pub async fn fetch_profile(&self, access_token: &str) -> Result<Identity, BridgeError> {
        let response = self
            .http
            .get(&self.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| BridgeError::profile_fetch_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BridgeError::profile_fetch_failed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let profile: ProviderProfile = response.json().await.map_err(|e| {
            BridgeError::profile_fetch_failed(format!("invalid profile response: {e}"))
        })?;

        profile
            .into_identity()
            .ok_or_else(|| BridgeError::profile_fetch_failed("profile has no subject id"))
    }
}
