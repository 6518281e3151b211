//! Sync Trigger: best-effort bookmark import.
//!
//! Each record is inserted only when no page has its url; the check and
//! the insert are one store operation, so concurrent batches do not
//! duplicate a url. A failing record is counted as skipped and the batch
//! continues.

use pagesaver_storage::{DynPageStore, NewPage, PageStore};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::BridgeError;

/// Title stored for bookmarks that have none.
pub const DEFAULT_TITLE: &str = "Untitled";

/// A bookmark-like record submitted for synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub date_added: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl BookmarkRecord {
    #[must_use]
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: Some(title.into()),
            date_added: None,
            description: None,
        }
    }

    /// Normalizes into a page payload, filling defaults from `now_ms`.
    #[must_use]
    pub fn into_new_page(self, now_ms: i64) -> NewPage {
        let title = self
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        NewPage {
            url: self.url,
            title,
            timestamp: self.date_added.unwrap_or(now_ms),
            description: self.description.unwrap_or_default(),
        }
    }
}

/// Counts returned by a sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub synced: u64,
    pub skipped: u64,
}

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

/// Imports bookmarks into the page store.
#[derive(Clone)]
pub struct SyncTrigger {
    pages: DynPageStore,
}

impl SyncTrigger {
    #[must_use]
    pub fn new(pages: DynPageStore) -> Self {
        Self { pages }
    }

    /// Synchronizes `records`, deduplicating by url against the store.
    pub async fn sync(&self, records: Vec<BookmarkRecord>) -> SyncSummary {
        let mut summary = SyncSummary::default();
        let total = records.len();

        for record in records {
            match self.sync_one(record).await {
                Ok(true) => summary.synced += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "Error syncing bookmark");
                    summary.skipped += 1;
                }
            }
        }

        tracing::info!(
            total,
            synced = summary.synced,
            skipped = summary.skipped,
            "Bookmark sync finished"
        );
        summary
    }

    /// Returns `Ok(true)` if inserted, `Ok(false)` if already known.
    async fn sync_one(&self, record: BookmarkRecord) -> Result<bool, BridgeError> {
        let url = record.url.clone();
        let inserted = self
            .pages
            .insert_if_absent(record.into_new_page(now_millis()))
            .await
            .map_err(|e| BridgeError::sync_record_failed(&url, e.to_string()))?;
        Ok(inserted.is_some())
    }
}
