//! OAuth authorization-code flow against the identity provider.
//!
//! - [`state`] - one-time CSRF state values
//! - [`flow`] - the OAuth Flow Initiator and callback validation
//! - [`exchange`] - the Token Exchange Client

pub mod exchange;
pub mod flow;
pub mod state;

pub use exchange::{ExchangeOutcome, TokenExchangeClient};
pub use flow::{
    AuthorizationGrant, AuthorizationRequest, OAuthFlowInitiator, WebAuthFlow, parse_callback,
};
pub use state::CsrfState;
