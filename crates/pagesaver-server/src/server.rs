use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::FromRef,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use pagesaver_auth::http as auth_http;
use pagesaver_auth::{
    AuthState, InMemorySessionStore, SessionBridge, SessionStore, SyncTrigger, TokenExchangeClient,
};
use pagesaver_storage::{DynPageStore, InMemoryStore};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::AppConfig, handlers, middleware as app_middleware};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

/// Router state. Auth handlers see the [`AuthState`] part through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub pages: DynPageStore,
    pub sync: SyncTrigger,
    pub sessions: Arc<dyn SessionStore>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl AppState {
    /// Wires the state over a document store and a session store.
    pub fn new(cfg: &AppConfig, store: Arc<InMemoryStore>, sessions: Arc<dyn SessionStore>) -> Self {
        let bridge = SessionBridge::new(sessions.clone(), store.clone(), cfg.session.clone());
        let exchange = TokenExchangeClient::new(&cfg.linkedin);
        let auth = AuthState::new(cfg.linkedin.clone(), exchange, bridge, store.clone());
        Self {
            auth,
            pages: store.clone(),
            sync: SyncTrigger::new(store),
            sessions,
        }
    }

    /// State over fresh in-memory stores.
    pub fn in_memory(cfg: &AppConfig) -> Self {
        Self::new(
            cfg,
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemorySessionStore::new()),
        )
    }
}

pub struct PageSaverServer {
    addr: SocketAddr,
    app: Router,
    sessions: Arc<dyn SessionStore>,
}

pub fn build_app(cfg: &AppConfig) -> Router {
    build_app_with_state(cfg, AppState::in_memory(cfg))
}

pub fn build_app_with_state(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;

    // Cookie session, JSON 401
    let session_api = Router::new()
        .route("/api/pages", get(handlers::list_pages).post(handlers::create_page))
        .route("/api/pages/stats", get(handlers::page_stats))
        .route("/api/pages/{id}", delete(handlers::delete_page))
        .route("/api/user", get(handlers::current_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::require_session,
        ));

    // Cookie session or bearer token
    let token_api = Router::new()
        .route("/api/pages/token", post(handlers::create_page_with_token))
        .route("/api/pages/bookmarks/token", post(handlers::sync_bookmarks))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::require_identity,
        ));

    let pages = Router::new()
        .route("/dashboard", get(handlers::dashboard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::require_page_session,
        ));

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/linkedin/token", post(auth_http::token_exchange_handler))
        .route("/api/session/validate", get(auth_http::session_validate_handler))
        .route("/api/logout", get(auth_http::logout_handler))
        .route("/logout", get(auth_http::logout_handler))
        .route("/auth/logout", get(auth_http::logout_handler))
        .route("/auth/linkedin", get(auth_http::login_handler))
        .route("/auth/linkedin/callback", get(auth_http::callback_handler))
        .route("/login", get(handlers::login_page))
        .merge(session_api)
        .merge(token_api)
        .merge(pages)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(cors_layer(&cfg.cors.origin))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

/// CORS with credentials. `*` mirrors the request origin.
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::mirror_request()
    } else {
        match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                tracing::warn!(origin, error = %e, "Invalid CORS origin, mirroring request origin");
                AllowOrigin::mirror_request()
            }
        }
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub fn build(self) -> PageSaverServer {
        let state = AppState::in_memory(&self.config);
        let sessions = state.sessions.clone();
        let app = build_app_with_state(&self.config, state);

        PageSaverServer {
            addr: self.addr,
            app,
            sessions,
        }
    }
}

impl PageSaverServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);

        let cleanup = tokio::spawn(cleanup_sessions(self.sessions.clone()));
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        cleanup.abort();
        served?;
        Ok(())
    }
}

async fn cleanup_sessions(sessions: Arc<dyn SessionStore>) {
    let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
    loop {
        interval.tick().await;
        match sessions.cleanup_expired().await {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "Expired sessions removed"),
            Err(e) => tracing::warn!(error = %e, "Session cleanup failed"),
        }
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
