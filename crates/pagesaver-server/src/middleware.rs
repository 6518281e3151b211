use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use pagesaver_auth::Identity;
use pagesaver_auth::http::{json_error, see_other};
use pagesaver_auth::AuthState;

/// Identity of the authenticated caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

/// Cookie-session authentication for API routes. Answers 401 JSON.
pub async fn require_session(
    State(state): State<AuthState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match state.session_identity(&jar).await {
        Some(identity) => {
            req.extensions_mut().insert(CurrentUser(identity));
            next.run(req).await
        }
        None => {
            tracing::debug!(path = %req.uri().path(), "No authenticated session");
            json_error(StatusCode::UNAUTHORIZED, "Authentication required")
        }
    }
}

/// Cookie-session authentication for HTML pages. Redirects to `/login`.
pub async fn require_page_session(
    State(state): State<AuthState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match state.session_identity(&jar).await {
        Some(identity) => {
            req.extensions_mut().insert(CurrentUser(identity));
            next.run(req).await
        }
        None => see_other("/login"),
    }
}

/// Session cookie first, then bearer token. Answers 401 JSON.
pub async fn require_identity(
    State(state): State<AuthState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match state.authenticate(&jar, req.headers()).await {
        Ok(identity) => {
            req.extensions_mut().insert(CurrentUser(identity));
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), error = %e, "Request not authenticated");
            json_error(StatusCode::UNAUTHORIZED, "Authentication required")
        }
    }
}
