//! Extension-side bookmark sync: read the tree, flatten, upload.

use std::sync::Arc;

use pagesaver_auth::SyncSummary;

use crate::backend::BackendClient;
use crate::bookmarks::{BookmarkSource, flatten_bookmarks};
use crate::credentials::CredentialStore;
use crate::error::ExtensionError;

/// Uploads the browser bookmarks using the stored credential.
#[derive(Clone)]
pub struct BookmarkSync {
    credentials: Arc<CredentialStore>,
    backend: BackendClient,
    source: Arc<dyn BookmarkSource>,
}

impl BookmarkSync {
    #[must_use]
    pub fn new(
        credentials: Arc<CredentialStore>,
        backend: BackendClient,
        source: Arc<dyn BookmarkSource>,
    ) -> Self {
        Self {
            credentials,
            backend,
            source,
        }
    }

    /// Syncs every bookmark.
    ///
    /// Returns `Ok(None)` without a network call when the tree holds no
    /// bookmarks.
    ///
    /// # Errors
    ///
    /// [`ExtensionError::NotLoggedIn`] without a stored token, otherwise
    /// whatever the bookmark source or backend reports.
    pub async fn sync_all(&self) -> Result<Option<SyncSummary>, ExtensionError> {
        let token = self
            .credentials
            .access_token()
            .await?
            .ok_or(ExtensionError::NotLoggedIn)?;

        let tree = self.source.tree().await?;
        let records = flatten_bookmarks(&tree);
        if records.is_empty() {
            tracing::debug!("No bookmarks to sync");
            return Ok(None);
        }

        let count = records.len();
        let summary = self.backend.sync_bookmarks(&token, &records).await?;
        tracing::info!(
            bookmarks = count,
            synced = summary.synced,
            skipped = summary.skipped,
            "Bookmark sync completed"
        );
        Ok(Some(summary))
    }

    /// Syncs only when a token is stored. Used for bookmark-created events.
    pub async fn sync_if_logged_in(&self) -> Result<Option<SyncSummary>, ExtensionError> {
        if self.credentials.access_token().await?.is_none() {
            tracing::debug!("Bookmark change ignored, not logged in");
            return Ok(None);
        }
        self.sync_all().await
    }
}
