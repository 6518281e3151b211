//! Session probe and logout endpoints.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use super::{AuthState, see_other};
use crate::session::{SessionProbe, cookies};

/// `GET /api/session/validate`: reports the cookie session without touching it.
pub async fn session_validate_handler(
    State(state): State<AuthState>,
    jar: CookieJar,
) -> Json<SessionProbe> {
    let probe = state.bridge.probe(state.session_id(&jar).as_deref()).await;
    tracing::debug!(authenticated = probe.authenticated, "Session probe");
    Json(probe)
}

/// `GET /logout` and `GET /auth/logout`: destroys the session and redirects
/// to the login page.
///
/// A failed destroy is logged; the user is still sent to the logged-out
/// page and the cookie is cleared.
pub async fn logout_handler(State(state): State<AuthState>, jar: CookieJar) -> Response {
    let session_id = state.session_id(&jar);
    if let Err(e) = state.bridge.teardown(session_id.as_deref()).await {
        tracing::warn!(error = %e, "Logout continued after session destroy failure");
    }

    let jar = cookies::without_session(jar, state.bridge.config());
    (jar, see_other("/login")).into_response()
}
