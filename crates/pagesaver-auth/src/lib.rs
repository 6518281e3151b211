//! # pagesaver-auth
//!
//! Authentication bridge between the browser extension, the dashboard
//! session and the identity provider.
//!
//! ## Modules
//!
//! - [`config`] - provider and session configuration
//! - [`error`] - the bridge error taxonomy
//! - [`identity`] - identity, credential and provider payload types
//! - [`oauth`] - OAuth Flow Initiator and Token Exchange Client
//! - [`session`] - Session Bridge over a server-side session store
//! - [`sync`] - Sync Trigger for bookmark import
//! - [`http`] - Axum handlers for the auth endpoints

pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod oauth;
pub mod session;
pub mod sync;

pub use config::{ConfigError, ProviderConfig, SessionConfig};
pub use error::{BridgeError, ErrorCategory};
pub use http::{AuthState, SESSION_BASED_TOKEN};
pub use identity::{AccessCredential, Identity, ProviderProfile};
pub use oauth::{
    AuthorizationGrant, AuthorizationRequest, CsrfState, ExchangeOutcome, OAuthFlowInitiator,
    TokenExchangeClient, WebAuthFlow,
};
pub use session::{InMemorySessionStore, SessionBridge, SessionProbe, SessionStore};
pub use sync::{BookmarkRecord, SyncSummary, SyncTrigger};

/// Type alias for bridge results.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::BridgeError;
    pub use crate::identity::{AccessCredential, Identity};
    pub use crate::oauth::{CsrfState, OAuthFlowInitiator, TokenExchangeClient, WebAuthFlow};
    pub use crate::session::{SessionBridge, SessionProbe};
    pub use crate::sync::{BookmarkRecord, SyncSummary, SyncTrigger};
    pub use crate::BridgeResult;
}
