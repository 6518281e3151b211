//! Session Bridge.
//!
//! Turns a verified identity and credential into a cookie-backed server
//! session and mirrors the credential into the persisted token record.

use std::sync::Arc;

use pagesaver_storage::{DynTokenRecordStore, TokenRecord, TokenRecordStore};
use serde::{Deserialize, Serialize};

use super::store::{SessionRecord, SessionStore};
use crate::config::SessionConfig;
use crate::error::BridgeError;
use crate::identity::{AccessCredential, Identity};
use crate::oauth::CsrfState;

/// Result of a session probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProbe {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
}

impl SessionProbe {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user: None,
        }
    }

    #[must_use]
    pub fn authenticated(identity: Identity) -> Self {
        Self {
            authenticated: true,
            user: Some(identity),
        }
    }
}

/// Probe, establish and teardown over a [`SessionStore`].
#[derive(Clone)]
pub struct SessionBridge {
    sessions: Arc<dyn SessionStore>,
    tokens: DynTokenRecordStore,
    config: SessionConfig,
}

impl SessionBridge {
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        tokens: DynTokenRecordStore,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions,
            tokens,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn ttl(&self) -> time::Duration {
        time::Duration::seconds(i64::try_from(self.config.max_age.as_secs()).unwrap_or(i64::MAX))
    }

    /// Reports whether `session_id` names an authenticated session.
    ///
    /// Never creates, extends or modifies a session.
    pub async fn probe(&self, session_id: Option<&str>) -> SessionProbe {
        let Some(id) = session_id else {
            return SessionProbe::anonymous();
        };
        match self.sessions.load(id).await {
            Ok(Some(record)) => record
                .identity()
                .map_or_else(SessionProbe::anonymous, SessionProbe::authenticated),
            Ok(None) => SessionProbe::anonymous(),
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed during probe");
                SessionProbe::anonymous()
            }
        }
    }

    /// Establishes a logged-in session and records the credential.
    ///
    /// A fresh session id is always issued; a pre-login session named by
    /// `previous` is discarded. The token record is upserted by subject id.
    /// If that write fails the error is logged and the session still counts
    /// as established.
    ///
    /// Returns the new session id.
    ///
    /// # Errors
    ///
    /// Returns an error only if the session itself cannot be saved.
    pub async fn establish(
        &self,
        previous: Option<&str>,
        identity: &Identity,
        credential: &AccessCredential,
    ) -> Result<String, BridgeError> {
        if let Some(old) = previous
            && let Err(e) = self.sessions.destroy(old).await
        {
            tracing::debug!(error = %e, "Could not discard pre-login session");
        }

        let mut record = SessionRecord::new(self.ttl());
        record.set_identity(identity);
        let session_id = record.id.clone();
        self.sessions.save(record).await?;

        let token_record = TokenRecord {
            user_id: identity.id.clone(),
            access_token: credential.access_token.clone(),
            expires_in: credential.expires_in,
            created_at: credential.issued_at,
        };
        if let Err(e) = self.tokens.upsert(token_record).await {
            tracing::error!(
                user_id = %identity.id,
                error = %e,
                "Failed to store token record; session established anyway"
            );
        }

        tracing::info!(user_id = %identity.id, "Session established");
        Ok(session_id)
    }

    /// Destroys the session entirely.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::SessionDestroyFailed`] if the store fails.
    /// Callers still treat the logout as done for the user.
    pub async fn teardown(&self, session_id: Option<&str>) -> Result<(), BridgeError> {
        let Some(id) = session_id else {
            return Ok(());
        };
        self.sessions.destroy(id).await.map_err(|e| {
            tracing::error!(error = %e, "Session destruction error");
            BridgeError::session_destroy_failed(e.to_string())
        })?;
        tracing::info!("Session destroyed");
        Ok(())
    }

    /// Starts a handshake: stores a fresh state as the session's only live
    /// state, creating an anonymous session when needed.
    ///
    /// Returns the session id and the state to send.
    pub async fn begin_handshake(
        &self,
        session_id: Option<&str>,
    ) -> Result<(String, CsrfState), BridgeError> {
        let existing = match session_id {
            Some(id) => self.sessions.load(id).await?,
            None => None,
        };
        let mut record = existing.unwrap_or_else(|| SessionRecord::new(self.ttl()));

        let state = CsrfState::generate();
        record.oauth_state = Some(state.clone());
        let id = record.id.clone();
        self.sessions.save(record).await?;
        Ok((id, state))
    }

    /// Removes and returns the live state of a session.
    ///
    /// The state is invalidated whether or not the handshake then succeeds.
    pub async fn take_state(&self, session_id: Option<&str>) -> Result<Option<CsrfState>, BridgeError> {
        let Some(id) = session_id else {
            return Ok(None);
        };
        let Some(mut record) = self.sessions.load(id).await? else {
            return Ok(None);
        };
        let state = record.oauth_state.take();
        if state.is_some() {
            self.sessions.save(record).await?;
        }
        Ok(state)
    }
}
