//! Unified Login Coordinator.
//!
//! One login request runs a strict sequence: probe the backend session
//! first; only when that reports no session does the OAuth flow start.
//! Both successful outcomes trigger exactly one bookmark sync whose result
//! never changes the reported outcome.

use std::sync::Arc;

use async_trait::async_trait;
use pagesaver_auth::http::TokenExchangeResponse;
use pagesaver_auth::{
    AccessCredential, AuthorizationGrant, BridgeError, Identity, OAuthFlowInitiator,
    SessionProbe, SyncSummary,
};
use serde::{Deserialize, Serialize};

use crate::backend::BackendClient;
use crate::credentials::CredentialStore;
use crate::error::ExtensionError;
use crate::sync::BookmarkSync;

/// Reports the backend session.
#[async_trait]
pub trait SessionProber: Send + Sync {
    async fn probe(&self) -> Result<SessionProbe, ExtensionError>;
}

/// Runs the interactive authorization.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self) -> Result<AuthorizationGrant, BridgeError>;

    /// Redirect target the grant was issued for.
    fn redirect_uri(&self) -> &str;
}

/// Trades an authorization code for a credential.
#[async_trait]
pub trait CodeExchanger: Send + Sync {
    async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenExchangeResponse, ExtensionError>;
}

/// Starts a bookmark sync.
#[async_trait]
pub trait BookmarkSyncer: Send + Sync {
    async fn sync(&self) -> Result<Option<SyncSummary>, ExtensionError>;
}

#[async_trait]
impl SessionProber for BackendClient {
    async fn probe(&self) -> Result<SessionProbe, ExtensionError> {
        self.probe_session().await
    }
}

#[async_trait]
impl CodeExchanger for BackendClient {
    async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenExchangeResponse, ExtensionError> {
        self.exchange_code(code, redirect_uri).await
    }
}

#[async_trait]
impl Authorizer for OAuthFlowInitiator {
    async fn authorize(&self) -> Result<AuthorizationGrant, BridgeError> {
        OAuthFlowInitiator::authorize(self).await
    }

    fn redirect_uri(&self) -> &str {
        &self.request().redirect_uri
    }
}

#[async_trait]
impl BookmarkSyncer for BookmarkSync {
    async fn sync(&self) -> Result<Option<SyncSummary>, ExtensionError> {
        self.sync_all().await
    }
}

/// Terminal outcome of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoginOutcome {
    /// The backend session already covered the request.
    ExistingSession { user: Option<Identity> },
    /// A fresh OAuth flow and exchange ran.
    NewLogin {
        user: Option<Identity>,
        expires_in: u64,
    },
}

impl LoginOutcome {
    #[must_use]
    pub fn user(&self) -> Option<&Identity> {
        match self {
            Self::ExistingSession { user } | Self::NewLogin { user, .. } => user.as_ref(),
        }
    }
}

/// Login state machine over its collaborators.
#[derive(Clone)]
pub struct LoginCoordinator {
    prober: Arc<dyn SessionProber>,
    authorizer: Arc<dyn Authorizer>,
    exchanger: Arc<dyn CodeExchanger>,
    credentials: Arc<CredentialStore>,
    syncer: Arc<dyn BookmarkSyncer>,
}

impl LoginCoordinator {
    #[must_use]
    pub fn new(
        prober: Arc<dyn SessionProber>,
        authorizer: Arc<dyn Authorizer>,
        exchanger: Arc<dyn CodeExchanger>,
        credentials: Arc<CredentialStore>,
        syncer: Arc<dyn BookmarkSyncer>,
    ) -> Self {
        Self {
            prober,
            authorizer,
            exchanger,
            credentials,
            syncer,
        }
    }

    /// Runs one login request.
    ///
    /// # Errors
    ///
    /// OAuth and exchange failures propagate unchanged. Sync failures are
    /// only logged.
    pub async fn login(&self) -> Result<LoginOutcome, ExtensionError> {
        let outcome = match self.existing_session().await {
            Some(user) => {
                tracing::info!("Existing session found, skipping OAuth");
                self.credentials.set_session_based(user.as_ref()).await?;
                LoginOutcome::ExistingSession { user }
            }
            None => self.new_login().await?,
        };

        match self.syncer.sync().await {
            Ok(Some(summary)) => {
                tracing::info!(synced = summary.synced, skipped = summary.skipped, "Post-login sync done");
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Post-login sync failed"),
        }
        Ok(outcome)
    }

    /// `Some(user)` when the backend reports a session. A failed probe
    /// counts as no session.
    async fn existing_session(&self) -> Option<Option<Identity>> {
        match self.prober.probe().await {
            Ok(probe) if probe.authenticated => Some(probe.user),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Session probe failed, starting OAuth");
                None
            }
        }
    }

    async fn new_login(&self) -> Result<LoginOutcome, ExtensionError> {
        let grant = self.authorizer.authorize().await?;
        let reply = self
            .exchanger
            .exchange(&grant.code, self.authorizer.redirect_uri())
            .await?;

        let user = reply.user_id.clone().map(|id| Identity {
            id,
            name: reply.name.clone(),
            email: None,
            picture: None,
        });
        let credential = AccessCredential::issued_now(reply.access_token, reply.expires_in);
        self.credentials
            .set_credential(&credential, user.as_ref())
            .await?;

        tracing::info!(profile = user.is_some(), "Login completed");
        Ok(LoginOutcome::NewLogin {
            user,
            expires_in: credential.expires_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use pagesaver_auth::CsrfState;
    use tokio::sync::mpsc;

    use super::*;
    use crate::credentials::{MemoryArea, SyncTick};

    struct FixedProbe(Result<SessionProbe, u16>);

    #[async_trait]
    impl SessionProber for FixedProbe {
        async fn probe(&self) -> Result<SessionProbe, ExtensionError> {
            self.0
                .clone()
                .map_err(|status| ExtensionError::backend(status, "probe failed"))
        }
    }

    #[derive(Default)]
    struct CountingAuthorizer {
        calls: AtomicUsize,
        deny: bool,
    }

    #[async_trait]
    impl Authorizer for CountingAuthorizer {
        async fn authorize(&self) -> Result<AuthorizationGrant, BridgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.deny {
                return Err(BridgeError::provider_denied("access_denied", "user cancelled"));
            }
            Ok(AuthorizationGrant {
                code: "code-1".to_string(),
                state: CsrfState::generate(),
            })
        }

        fn redirect_uri(&self) -> &str {
            "https://ext.chromiumapp.org/"
        }
    }

    struct FixedExchanger(Result<TokenExchangeResponse, u16>);

    #[async_trait]
    impl CodeExchanger for FixedExchanger {
        async fn exchange(
            &self,
            code: &str,
            redirect_uri: &str,
        ) -> Result<TokenExchangeResponse, ExtensionError> {
            assert_eq!(code, "code-1");
            assert_eq!(redirect_uri, "https://ext.chromiumapp.org/");
            self.0
                .clone()
                .map_err(|status| BridgeError::exchange_failed(status, "invalid_grant").into())
        }
    }

    #[derive(Default)]
    struct CountingSyncer {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl BookmarkSyncer for CountingSyncer {
        async fn sync(&self) -> Result<Option<SyncSummary>, ExtensionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ExtensionError::backend(500, "sync down"));
            }
            Ok(Some(SyncSummary { synced: 1, skipped: 0 }))
        }
    }

    fn exchange_reply() -> TokenExchangeResponse {
        TokenExchangeResponse {
            success: true,
            access_token: "tok".to_string(),
            expires_in: 5_184_000,
            token_type: "Bearer".to_string(),
            user_id: Some("sub-1".to_string()),
            name: Some("Ada".to_string()),
        }
    }

    fn ada() -> Identity {
        Identity {
            id: "sub-1".to_string(),
            name: Some("Ada".to_string()),
            email: None,
            picture: None,
        }
    }

    struct Harness {
        coordinator: LoginCoordinator,
        authorizer: Arc<CountingAuthorizer>,
        syncer: Arc<CountingSyncer>,
        credentials: Arc<CredentialStore>,
        _ticks: mpsc::Receiver<SyncTick>,
    }

    fn harness(
        probe: Result<SessionProbe, u16>,
        authorizer: CountingAuthorizer,
        exchange: Result<TokenExchangeResponse, u16>,
        syncer: CountingSyncer,
    ) -> Harness {
        let (tx, rx) = mpsc::channel(4);
        let credentials = Arc::new(CredentialStore::new(
            Arc::new(MemoryArea::new()),
            tx,
            Duration::from_secs(3600),
        ));
        let authorizer = Arc::new(authorizer);
        let syncer = Arc::new(syncer);
        let coordinator = LoginCoordinator::new(
            Arc::new(FixedProbe(probe)),
            authorizer.clone(),
            Arc::new(FixedExchanger(exchange)),
            credentials.clone(),
            syncer.clone(),
        );
        Harness {
            coordinator,
            authorizer,
            syncer,
            credentials,
            _ticks: rx,
        }
    }

    #[tokio::test]
    async fn test_existing_session_never_starts_oauth() {
        let h = harness(
            Ok(SessionProbe::authenticated(ada())),
            CountingAuthorizer::default(),
            Ok(exchange_reply()),
            CountingSyncer::default(),
        );

        let outcome = h.coordinator.login().await.unwrap();
        assert_eq!(outcome, LoginOutcome::ExistingSession { user: Some(ada()) });
        assert_eq!(h.authorizer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.syncer.calls.load(Ordering::SeqCst), 1);

        let stored = h.credentials.credential().await.unwrap().unwrap();
        assert!(stored.is_session_based());
    }

    #[tokio::test]
    async fn test_new_login_stores_credential_and_syncs_once() {
        let h = harness(
            Ok(SessionProbe::anonymous()),
            CountingAuthorizer::default(),
            Ok(exchange_reply()),
            CountingSyncer::default(),
        );

        let outcome = h.coordinator.login().await.unwrap();
        assert_eq!(
            outcome,
            LoginOutcome::NewLogin {
                user: Some(ada()),
                expires_in: 5_184_000
            }
        );
        assert_eq!(h.authorizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.syncer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.credentials.access_token().await.unwrap().as_deref(),
            Some("tok")
        );
        assert_eq!(h.credentials.user().await.unwrap(), Some(ada()));
    }

    #[tokio::test]
    async fn test_failed_probe_falls_back_to_oauth() {
        let h = harness(
            Err(503),
            CountingAuthorizer::default(),
            Ok(exchange_reply()),
            CountingSyncer::default(),
        );

        let outcome = h.coordinator.login().await.unwrap();
        assert!(matches!(outcome, LoginOutcome::NewLogin { .. }));
        assert_eq!(h.authorizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_denied_propagates_without_sync() {
        let h = harness(
            Ok(SessionProbe::anonymous()),
            CountingAuthorizer {
                deny: true,
                ..CountingAuthorizer::default()
            },
            Ok(exchange_reply()),
            CountingSyncer::default(),
        );

        let err = h.coordinator.login().await.unwrap_err();
        assert!(matches!(
            err,
            ExtensionError::Bridge(BridgeError::ProviderDenied { .. })
        ));
        assert_eq!(
            err.to_string(),
            "OAuth error: access_denied - user cancelled"
        );
        assert_eq!(h.syncer.calls.load(Ordering::SeqCst), 0);
        assert!(h.credentials.access_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exchange_failure_propagates_status() {
        let h = harness(
            Ok(SessionProbe::anonymous()),
            CountingAuthorizer::default(),
            Err(400),
            CountingSyncer::default(),
        );

        let err = h.coordinator.login().await.unwrap_err();
        assert!(matches!(
            err,
            ExtensionError::Bridge(BridgeError::ExchangeFailed { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn test_sync_failure_does_not_fail_login() {
        let h = harness(
            Ok(SessionProbe::anonymous()),
            CountingAuthorizer::default(),
            Ok(exchange_reply()),
            CountingSyncer {
                fail: true,
                ..CountingSyncer::default()
            },
        );

        assert!(h.coordinator.login().await.is_ok());
        assert_eq!(h.syncer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_outcome_serializes_with_type_tag() {
        let value = serde_json::to_value(LoginOutcome::ExistingSession { user: None }).unwrap();
        assert_eq!(value["type"], "existing_session");
    }
}
