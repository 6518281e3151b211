//! Dashboard login: provider redirect and callback.
//!
//! `GET /auth/linkedin` stores a fresh state in the session and redirects to
//! the provider. `GET /auth/linkedin/callback` consumes that state, exchanges
//! the code and establishes the logged-in session.

use axum::{
    extract::{RawQuery, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use url::Url;

use super::{AuthState, see_other};
use crate::error::BridgeError;
use crate::identity::Identity;
use crate::oauth::{AuthorizationRequest, CsrfState, parse_callback};
use crate::session::cookies;

fn login_error(kind: &str) -> Response {
    see_other(&format!("/login?error={kind}"))
}

/// Starts the dashboard login.
pub async fn login_handler(State(state): State<AuthState>, jar: CookieJar) -> Response {
    let session_id = state.session_id(&jar);
    let (session_id, csrf) = match state.bridge.begin_handshake(session_id.as_deref()).await {
        Ok(started) => started,
        Err(e) => {
            tracing::error!(error = %e, "Could not start login handshake");
            return login_error(e.kind());
        }
    };

    let request = AuthorizationRequest {
        authorization_endpoint: state.provider.authorization_endpoint.clone(),
        client_id: state.provider.client_id.clone(),
        redirect_uri: state.provider.callback_url.clone(),
        scope: state.provider.scope.clone(),
        response_type: state.provider.response_type.clone(),
    };
    let url = match request.authorization_url(&csrf) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "Invalid authorization endpoint");
            return login_error(e.kind());
        }
    };

    tracing::info!("Redirecting to identity provider");
    let jar = cookies::with_session(jar, state.bridge.config(), &session_id);
    (jar, see_other(url.as_str())).into_response()
}

/// Handles the provider redirect.
pub async fn callback_handler(
    State(state): State<AuthState>,
    jar: CookieJar,
    RawQuery(query): RawQuery,
) -> Response {
    let session_id = state.session_id(&jar);

    match complete_login(&state, session_id.as_deref(), query.as_deref()).await {
        Ok((new_session_id, identity)) => {
            state.record_user(&identity).await;
            let jar = cookies::with_session(jar, state.bridge.config(), &new_session_id);
            (jar, see_other("/dashboard")).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, kind = e.kind(), "Dashboard login failed");
            login_error(e.kind())
        }
    }
}

async fn complete_login(
    state: &AuthState,
    session_id: Option<&str>,
    query: Option<&str>,
) -> Result<(String, Identity), BridgeError> {
    // Consumed here so it cannot be replayed, whatever the outcome.
    let expected = state
        .bridge
        .take_state(session_id)
        .await?
        .unwrap_or_else(|| CsrfState::from_issued(""));

    let mut callback = Url::parse(&state.provider.callback_url)?;
    callback.set_query(query);
    let grant = parse_callback(&callback, &expected)?;

    let credential = state
        .exchange
        .exchange_code(&grant.code, &state.provider.callback_url, &state.provider.client_id)
        .await?;
    let identity = state.exchange.fetch_profile(&credential.access_token).await?;

    let new_session_id = state
        .bridge
        .establish(session_id, &identity, &credential)
        .await?;
    Ok((new_session_id, identity))
}
