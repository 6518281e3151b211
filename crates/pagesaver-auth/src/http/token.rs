//! `POST /api/linkedin/token`: code-for-token exchange for the extension.
//!
//! The extension holds no client secret; it forwards the authorization code
//! here. On success the backend establishes a cookie session for the same
//! identity, so later session probes see the login too.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use super::{AuthState, json_error};
use crate::error::BridgeError;
use crate::session::cookies;

/// Request body sent by the extension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeRequest {
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
}

/// Successful exchange response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenExchangeResponse {
    pub success: bool,
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub name: Option<String>,
}

fn required(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Exchanges an authorization code on behalf of the extension.
pub async fn token_exchange_handler(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(request): Json<TokenExchangeRequest>,
) -> Response {
    tracing::info!(
        code_present = request.code.is_some(),
        redirect_uri = ?request.redirect_uri,
        client_id = ?request.client_id,
        secret_present = state.exchange.has_secret(),
        "Token exchange request received"
    );

    let (Some(code), Some(redirect_uri), Some(client_id)) = (
        required(request.code.as_ref()),
        required(request.redirect_uri.as_ref()),
        required(request.client_id.as_ref()),
    ) else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "Missing required parameters: code, redirectUri, clientId",
        );
    };

    if !state.exchange.has_secret() {
        tracing::error!("Client secret not configured");
        return json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error: LinkedIn client secret not set",
        );
    }

    let outcome = match state.exchange.exchange(code, redirect_uri, client_id).await {
        Ok(outcome) => outcome,
        Err(BridgeError::ExchangeFailed { status, body }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            return json_error(status, format!("LinkedIn token exchange failed: {body}"));
        }
        Err(e) => {
            tracing::error!(error = %e, "Error in token exchange");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error during token exchange",
            );
        }
    };

    let mut jar = jar;
    if let Some(identity) = outcome.identity() {
        let previous = state.session_id(&jar);
        match state
            .bridge
            .establish(previous.as_deref(), identity, &outcome.credential)
            .await
        {
            Ok(session_id) => {
                jar = cookies::with_session(jar, state.bridge.config(), &session_id);
            }
            Err(e) => tracing::error!(error = %e, "Failed to establish session after exchange"),
        }
        state.record_user(identity).await;
    }

    let identity = outcome.identity();
    let body = TokenExchangeResponse {
        success: true,
        access_token: outcome.credential.access_token.clone(),
        expires_in: outcome.credential.expires_in,
        token_type: outcome.credential.token_type.clone(),
        user_id: identity.map(|i| i.id.clone()),
        name: identity.and_then(|i| i.name.clone()),
    };

    (jar, (StatusCode::OK, Json(body))).into_response()
}
