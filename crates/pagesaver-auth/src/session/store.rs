//! Server-side session storage.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::BridgeError;
use crate::identity::Identity;
use crate::oauth::CsrfState;

/// Server-side state behind a session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque session id carried by the cookie.
    pub id: String,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
    /// The single live CSRF state of a handshake in progress.
    pub oauth_state: Option<CsrfState>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl SessionRecord {
    /// Creates an anonymous session with a fresh id.
    #[must_use]
    pub fn new(ttl: time::Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: generate_session_id(),
            user_id: None,
            name: None,
            email: None,
            picture: None,
            oauth_state: None,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }

    /// Returns the identity if a login has been established on this session.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.user_id.as_ref().map(|id| Identity {
            id: id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            picture: self.picture.clone(),
        })
    }

    /// Copies identity fields into the session.
    pub fn set_identity(&mut self, identity: &Identity) {
        self.user_id = Some(identity.id.clone());
        self.name.clone_from(&identity.name);
        self.email.clone_from(&identity.email);
        self.picture.clone_from(&identity.picture);
    }
}

/// Generates an opaque session id from 32 random bytes.
#[must_use]
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Storage trait for server-side sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a session by id.
    ///
    /// Returns `None` if the session does not exist or has expired. Loading
    /// never modifies the store.
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, BridgeError>;

    /// Inserts or replaces a session.
    async fn save(&self, record: SessionRecord) -> Result<(), BridgeError>;

    /// Removes a session entirely. Destroying an unknown id succeeds.
    async fn destroy(&self, id: &str) -> Result<(), BridgeError>;

    /// Removes expired sessions, returning how many were removed.
    async fn cleanup_expired(&self) -> Result<u64, BridgeError>;
}

/// In-memory session store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, SessionRecord>,
    fail_destroy: AtomicBool,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `destroy` fail, for exercising the non-fatal teardown path.
    pub fn set_fail_destroy(&self, fail: bool) {
        self.fail_destroy.store(fail, Ordering::SeqCst);
    }

    /// Number of stored sessions, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, BridgeError> {
        Ok(self
            .sessions
            .get(id)
            .map(|s| s.value().clone())
            .filter(|s| !s.is_expired()))
    }

    async fn save(&self, record: SessionRecord) -> Result<(), BridgeError> {
        self.sessions.insert(record.id.clone(), record);
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), BridgeError> {
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(BridgeError::session("session store refused destroy"));
        }
        self.sessions.remove(id);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<u64, BridgeError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired());
        Ok((before - self.sessions.len()) as u64)
    }
}
