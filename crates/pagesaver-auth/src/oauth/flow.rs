//! OAuth Flow Initiator.
//!
//! Builds the authorization redirect, hands it to an interactive surface and
//! validates what comes back. The surface is abstracted by [`WebAuthFlow`] so
//! the same logic serves the browser extension and tests.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::state::CsrfState;
use crate::error::BridgeError;

/// Interactive surface that shows the provider's consent page.
///
/// `launch` suspends until the provider redirects to the registered
/// redirect target and returns the full redirect URL. A surface closed by
/// the user, or one that produced no redirect, is reported as
/// [`BridgeError::ProviderDenied`]; callers do not distinguish the two.
#[async_trait]
pub trait WebAuthFlow: Send + Sync {
    async fn launch(&self, authorization_url: Url) -> Result<Url, BridgeError>;
}

/// Parameters of the authorization request.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub authorization_endpoint: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub response_type: String,
}

impl AuthorizationRequest {
    /// Builds the authorization URL carrying `state`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidUrl`] if the endpoint cannot be parsed.
    pub fn authorization_url(&self, state: &CsrfState) -> Result<Url, BridgeError> {
        let mut url = Url::parse(&self.authorization_endpoint)?;
        url.query_pairs_mut()
            .append_pair("response_type", &self.response_type)
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scope)
            .append_pair("state", state.as_str());
        Ok(url)
    }
}

/// A verified authorization code.
#[derive(Debug, Clone)]
pub struct AuthorizationGrant {
    pub code: String,
    pub state: CsrfState,
}

/// Validates the provider's redirect against the state that was sent.
///
/// Checks run in a fixed order: provider error, then state, then code.
///
/// # Errors
///
/// - [`BridgeError::ProviderDenied`] if an `error` parameter is present
/// - [`BridgeError::CsrfMismatch`] if `state` differs from `expected`
/// - [`BridgeError::MissingCode`] if no `code` is present
pub fn parse_callback(
    callback: &Url,
    expected: &CsrfState,
) -> Result<AuthorizationGrant, BridgeError> {
    let mut code = None;
    let mut error = None;
    let mut error_description = None;
    let mut state = None;

    for (key, value) in callback.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => error_description = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(BridgeError::provider_denied(
            error,
            error_description.unwrap_or_default(),
        ));
    }

    expected.verify(state.as_deref())?;

    match code.filter(|c| !c.is_empty()) {
        Some(code) => Ok(AuthorizationGrant {
            code,
            state: expected.clone(),
        }),
        None => Err(BridgeError::MissingCode),
    }
}

/// Runs the interactive authorization step of a login.
pub struct OAuthFlowInitiator {
    request: AuthorizationRequest,
    flow: Arc<dyn WebAuthFlow>,
}

impl OAuthFlowInitiator {
    #[must_use]
    pub fn new(request: AuthorizationRequest, flow: Arc<dyn WebAuthFlow>) -> Self {
        Self { request, flow }
    }

    #[must_use]
    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    /// Opens the authorization redirect and returns the verified code.
    ///
    /// A fresh state is generated on every call.
    pub async fn authorize(&self) -> Result<AuthorizationGrant, BridgeError> {
        let state = CsrfState::generate();
        let url = self.request.authorization_url(&state)?;

        tracing::info!(
            client_id = %self.request.client_id,
            redirect_uri = %self.request.redirect_uri,
            "Starting OAuth authorization flow"
        );

        let callback = self.flow.launch(url).await.inspect_err(|e| {
            tracing::warn!(error = %e, "Interactive authorization did not complete");
        })?;

        let grant = parse_callback(&callback, &state).inspect_err(|e| {
            tracing::warn!(error = %e, kind = e.kind(), "Authorization callback rejected");
        })?;

        tracing::debug!("Authorization code received and state verified");
        Ok(grant)
    }
}
