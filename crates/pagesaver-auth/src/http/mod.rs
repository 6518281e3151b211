//! Axum handlers for the authentication endpoints.
//!
//! # Available Handlers
//!
//! - [`token`] - code-for-token exchange used by the extension
//! - [`session`] - session probe and logout
//! - [`login`] - dashboard login redirect and provider callback
//!
//! All handlers take [`AuthState`]; embed it in the application state and
//! implement `FromRef` to share it.

pub mod login;
pub mod session;
pub mod token;

use std::sync::Arc;

use axum::{
    Json,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use pagesaver_storage::{DynUserStore, UserRecord, UserStore};
use serde_json::json;
use time::OffsetDateTime;

use crate::config::ProviderConfig;
use crate::error::BridgeError;
use crate::identity::Identity;
use crate::oauth::TokenExchangeClient;
use crate::session::{SessionBridge, cookies};

pub use login::{callback_handler, login_handler};
pub use session::{logout_handler, session_validate_handler};
pub use token::{TokenExchangeRequest, TokenExchangeResponse, token_exchange_handler};

/// Placeholder bearer value stored by the extension when it reuses a
/// dashboard session. It is never a provider token.
pub const SESSION_BASED_TOKEN: &str = "session_based";

/// Shared state for the authentication handlers.
#[derive(Clone)]
pub struct AuthState {
    pub provider: Arc<ProviderConfig>,
    pub exchange: TokenExchangeClient,
    pub bridge: SessionBridge,
    pub users: DynUserStore,
}

impl AuthState {
    #[must_use]
    pub fn new(
        provider: ProviderConfig,
        exchange: TokenExchangeClient,
        bridge: SessionBridge,
        users: DynUserStore,
    ) -> Self {
        Self {
            provider: Arc::new(provider),
            exchange,
            bridge,
            users,
        }
    }

    /// Session id carried by the request, if any.
    #[must_use]
    pub fn session_id(&self, jar: &CookieJar) -> Option<String> {
        cookies::session_id(jar, self.bridge.config())
    }

    /// Identity of the cookie session, if authenticated.
    pub async fn session_identity(&self, jar: &CookieJar) -> Option<Identity> {
        self.bridge
            .probe(self.session_id(jar).as_deref())
            .await
            .user
    }

    /// Authenticates a request by session cookie, then by bearer token.
    ///
    /// Bearer tokens are accepted when the provider returns a profile for
    /// them. The `session_based` placeholder is never sent to the provider.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Unauthenticated`] when neither works.
    pub async fn authenticate(
        &self,
        jar: &CookieJar,
        headers: &HeaderMap,
    ) -> Result<Identity, BridgeError> {
        if let Some(identity) = self.session_identity(jar).await {
            return Ok(identity);
        }

        let Some(token) = bearer_token(headers) else {
            return Err(BridgeError::Unauthenticated);
        };
        if token == SESSION_BASED_TOKEN {
            tracing::debug!("Session-based placeholder token without a live session");
            return Err(BridgeError::Unauthenticated);
        }

        self.exchange.fetch_profile(token).await.map_err(|e| {
            tracing::debug!(error = %e, "Bearer token rejected");
            BridgeError::Unauthenticated
        })
    }

    /// Writes the user snapshot, logging failures.
    pub(crate) async fn record_user(&self, identity: &Identity) {
        let record = UserRecord {
            user_id: identity.id.clone(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            picture: identity.picture.clone(),
            last_login: OffsetDateTime::now_utc(),
        };
        if let Err(e) = self.users.upsert(record).await {
            tracing::error!(user_id = %identity.id, error = %e, "Failed to store user record");
        }
    }
}

/// Extracts a bearer token from the `Authorization` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// `{success: false, error}` JSON response.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": message.into(),
        })),
    )
        .into_response()
}

/// `303 See Other` redirect.
pub fn see_other(location: &str) -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, location.to_string())]).into_response()
}
