//! Credential Store: the extension-local key-value area.
//!
//! Holds the access token, its expiry metadata, the last known profile and
//! a backup of saved pages. The store also owns the periodic sync timer:
//! setting a credential starts it and clearing the credential stops it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use pagesaver_auth::{AccessCredential, Identity, SESSION_BASED_TOKEN};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

use crate::backend::PageData;
use crate::error::ExtensionError;

/// Storage keys.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "linkedin_access_token";
    pub const EXPIRES_IN: &str = "linkedin_expires_in";
    pub const TOKEN_TIMESTAMP: &str = "linkedin_token_timestamp";
    pub const USER_INFO: &str = "user_info";
    pub const SAVED_PAGES: &str = "savedPages";

    /// Keys removed on logout.
    pub const CREDENTIAL_KEYS: [&str; 3] = [ACCESS_TOKEN, EXPIRES_IN, TOKEN_TIMESTAMP];
}

/// Lifetime recorded for the `session_based` placeholder credential.
pub const SESSION_BASED_EXPIRES_IN: u64 = 86_400;

/// Asynchronous key-value area, modeled on the browser's local storage.
#[async_trait]
pub trait KeyValueArea: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, ExtensionError>;

    /// Writes all entries.
    async fn set(&self, entries: Vec<(&'static str, Value)>) -> Result<(), ExtensionError>;

    async fn remove(&self, keys: &[&str]) -> Result<(), ExtensionError>;
}

/// In-memory key-value area.
#[derive(Debug, Default)]
pub struct MemoryArea {
    entries: DashMap<String, Value>,
}

impl MemoryArea {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueArea for MemoryArea {
    async fn get(&self, key: &str) -> Result<Option<Value>, ExtensionError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, entries: Vec<(&'static str, Value)>) -> Result<(), ExtensionError> {
        for (key, value) in entries {
            self.entries.insert(key.to_string(), value);
        }
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), ExtensionError> {
        for key in keys {
            self.entries.remove(*key);
        }
        Ok(())
    }
}

/// Marker sent by the periodic timer each time a sync is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTick;

/// Credential as stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub access_token: String,
    pub expires_in: u64,
    /// Milliseconds since the Unix epoch.
    pub issued_at_ms: i64,
}

impl StoredCredential {
    /// `true` for the placeholder stored after an existing-session login.
    #[must_use]
    pub fn is_session_based(&self) -> bool {
        self.access_token == SESSION_BASED_TOKEN
    }
}

/// Extension-local credential storage with an owned sync timer.
pub struct CredentialStore {
    area: Arc<dyn KeyValueArea>,
    ticks: mpsc::Sender<SyncTick>,
    sync_interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl CredentialStore {
    /// Creates a store. Timer ticks are delivered on `ticks`.
    #[must_use]
    pub fn new(
        area: Arc<dyn KeyValueArea>,
        ticks: mpsc::Sender<SyncTick>,
        sync_interval: Duration,
    ) -> Self {
        Self {
            area,
            ticks,
            sync_interval,
            timer: Mutex::new(None),
        }
    }

    /// The stored access token, if any.
    pub async fn access_token(&self) -> Result<Option<String>, ExtensionError> {
        Ok(self
            .area
            .get(keys::ACCESS_TOKEN)
            .await?
            .and_then(|v| v.as_str().map(str::to_owned))
            .filter(|t| !t.is_empty()))
    }

    /// The stored credential with its metadata, if a token is present.
    pub async fn credential(&self) -> Result<Option<StoredCredential>, ExtensionError> {
        let Some(access_token) = self.access_token().await? else {
            return Ok(None);
        };
        let expires_in = self
            .area
            .get(keys::EXPIRES_IN)
            .await?
            .and_then(|v| v.as_u64())
            .unwrap_or_default();
        let issued_at_ms = self
            .area
            .get(keys::TOKEN_TIMESTAMP)
            .await?
            .and_then(|v| v.as_i64())
            .unwrap_or_default();
        Ok(Some(StoredCredential {
            access_token,
            expires_in,
            issued_at_ms,
        }))
    }

    /// Last known profile.
    pub async fn user(&self) -> Result<Option<Identity>, ExtensionError> {
        match self.area.get(keys::USER_INFO).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ExtensionError::storage(format!("corrupt user_info: {e}"))),
            None => Ok(None),
        }
    }

    /// Stores a credential obtained by a token exchange and starts the
    /// periodic sync.
    pub async fn set_credential(
        &self,
        credential: &AccessCredential,
        user: Option<&Identity>,
    ) -> Result<(), ExtensionError> {
        let issued_at_ms =
            i64::try_from(credential.issued_at.unix_timestamp_nanos() / 1_000_000).unwrap_or(0);
        self.write(
            &credential.access_token,
            credential.expires_in,
            issued_at_ms,
            user,
        )
        .await?;
        tracing::info!("Access token stored successfully");
        self.start_periodic_sync();
        Ok(())
    }

    /// Stores the `session_based` placeholder for an existing dashboard
    /// session and starts the periodic sync.
    pub async fn set_session_based(&self, user: Option<&Identity>) -> Result<(), ExtensionError> {
        self.write(
            SESSION_BASED_TOKEN,
            SESSION_BASED_EXPIRES_IN,
            pagesaver_auth::sync::now_millis(),
            user,
        )
        .await?;
        self.start_periodic_sync();
        Ok(())
    }

    async fn write(
        &self,
        token: &str,
        expires_in: u64,
        issued_at_ms: i64,
        user: Option<&Identity>,
    ) -> Result<(), ExtensionError> {
        let mut entries = vec![
            (keys::ACCESS_TOKEN, Value::from(token)),
            (keys::EXPIRES_IN, Value::from(expires_in)),
            (keys::TOKEN_TIMESTAMP, Value::from(issued_at_ms)),
        ];
        if let Some(user) = user {
            let value = serde_json::to_value(user)
                .map_err(|e| ExtensionError::storage(e.to_string()))?;
            entries.push((keys::USER_INFO, value));
        }
        self.area.set(entries).await
    }

    /// Stops the periodic sync and removes the credential keys.
    pub async fn clear_credential(&self) -> Result<(), ExtensionError> {
        self.stop_periodic_sync();
        self.area.remove(&keys::CREDENTIAL_KEYS).await
    }

    /// Pages kept locally as a backup of what was saved.
    pub async fn saved_pages(&self) -> Result<Vec<PageData>, ExtensionError> {
        match self.area.get(keys::SAVED_PAGES).await? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| ExtensionError::storage(format!("corrupt savedPages: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    /// Appends a page to the local backup.
    pub async fn append_saved_page(&self, page: &PageData) -> Result<(), ExtensionError> {
        let mut pages = self.saved_pages().await?;
        pages.push(page.clone());
        let value =
            serde_json::to_value(pages).map_err(|e| ExtensionError::storage(e.to_string()))?;
        self.area.set(vec![(keys::SAVED_PAGES, value)]).await
    }

    /// Starts the periodic sync, replacing a running timer.
    pub fn start_periodic_sync(&self) {
        let Ok(mut timer) = self.timer.lock() else {
            return;
        };
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        let ticks = self.ticks.clone();
        let period = self.sync_interval;
        *timer = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                tracing::debug!("Periodic sync triggered");
                if ticks.send(SyncTick).await.is_err() {
                    break;
                }
            }
        }));
        tracing::info!(interval_secs = period.as_secs(), "Periodic sync started");
    }

    /// Stops the periodic sync if it is running.
    pub fn stop_periodic_sync(&self) {
        if let Ok(mut timer) = self.timer.lock()
            && let Some(handle) = timer.take()
        {
            handle.abort();
            tracing::info!("Periodic sync stopped");
        }
    }

    /// `true` while the timer is running.
    #[must_use]
    pub fn is_periodic_sync_running(&self) -> bool {
        self.timer
            .lock()
            .map(|t| t.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for CredentialStore {
    fn drop(&mut self) {
        self.stop_periodic_sync();
    }
}
