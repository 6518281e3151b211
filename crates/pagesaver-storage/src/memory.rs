//! In-memory storage backend.
//!
//! Backed by concurrent hash maps. Data lives for the lifetime of the
//! process, which is what the server uses by default and what tests use.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::{Duration, OffsetDateTime};
use url::Url;
use uuid::Uuid;

use crate::error::StorageError;
use crate::traits::{PageStore, TokenRecordStore, UserStore};
use crate::types::{NewPage, PageStats, SavedPage, TokenRecord, UserRecord};

const PAGES: &str = "saved_pages";

#[derive(Debug, Clone)]
struct PageEntry {
    seq: u64,
    page: SavedPage,
}

/// In-memory implementation of all store traits.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    pages: DashMap<String, PageEntry>,
    /// url -> id of the earliest page stored under it
    url_index: DashMap<String, String>,
    tokens: DashMap<String, TokenRecord>,
    users: DashMap<String, UserRecord>,
    next_seq: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles outage mode. While set, every operation fails with
    /// [`StorageError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn new_entry(&self, page: NewPage) -> Result<PageEntry, StorageError> {
        if page.url.is_empty() {
            return Err(StorageError::invalid_input("page url cannot be empty"));
        }
        let now = OffsetDateTime::now_utc();
        Ok(PageEntry {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            page: SavedPage {
                id: Uuid::new_v4().to_string(),
                url: page.url,
                title: page.title,
                timestamp: page.timestamp,
                description: page.description,
                created_at: now,
                updated_at: now,
            },
        })
    }

    /// Points `url` at the earliest remaining page for it, if any.
    fn reindex_url(&self, url: &str) {
        let earliest = self
            .pages
            .iter()
            .filter(|entry| entry.page.url == url)
            .min_by_key(|entry| entry.seq)
            .map(|entry| entry.page.id.clone());
        if let Some(id) = earliest {
            self.url_index.entry(url.to_string()).or_insert(id);
        }
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("in-memory store is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl PageStore for InMemoryStore {
    async fn insert(&self, page: NewPage) -> Result<SavedPage, StorageError> {
        self.check_available()?;
        let entry = self.new_entry(page)?;
        let saved = entry.page.clone();
        self.pages.insert(saved.id.clone(), entry);
        self.url_index
            .entry(saved.url.clone())
            .or_insert_with(|| saved.id.clone());
        tracing::debug!(collection = PAGES, id = %saved.id, "page inserted");
        Ok(saved)
    }

    async fn insert_if_absent(&self, page: NewPage) -> Result<Option<SavedPage>, StorageError> {
        self.check_available()?;
        // The index entry stays locked until the page is stored.
        match self.url_index.entry(page.url.clone()) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => {
                let entry = self.new_entry(page)?;
                let saved = entry.page.clone();
                self.pages.insert(saved.id.clone(), entry);
                slot.insert(saved.id.clone());
                tracing::debug!(collection = PAGES, id = %saved.id, "page inserted");
                Ok(Some(saved))
            }
        }
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<SavedPage>, StorageError> {
        self.check_available()?;
        let Some(id) = self.url_index.get(url).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.pages.get(&id).map(|entry| entry.page.clone()))
    }

    async fn list(&self, limit: usize, skip: usize) -> Result<Vec<SavedPage>, StorageError> {
        self.check_available()?;
        let mut entries: Vec<PageEntry> = self.pages.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| {
            b.page
                .created_at
                .cmp(&a.page.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(entries
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|e| e.page)
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        self.check_available()?;
        let Some((_, removed)) = self.pages.remove(id) else {
            return Ok(false);
        };
        let url = removed.page.url;
        if self.url_index.remove_if(&url, |_, indexed| indexed == id).is_some() {
            self.reindex_url(&url);
        }
        Ok(true)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        self.check_available()?;
        Ok(self.pages.len() as u64)
    }

    async fn count_since(&self, since: OffsetDateTime) -> Result<u64, StorageError> {
        self.check_available()?;
        Ok(self
            .pages
            .iter()
            .filter(|entry| entry.page.created_at >= since)
            .count() as u64)
    }

    async fn stats(&self) -> Result<PageStats, StorageError> {
        let total_pages = PageStore::count(self).await?;
        let week_pages = self
            .count_since(OffsetDateTime::now_utc() - Duration::days(7))
            .await?;

        let domains: HashSet<String> = self
            .pages
            .iter()
            .filter_map(|entry| {
                Url::parse(&entry.page.url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_owned))
            })
            .collect();

        Ok(PageStats {
            total_pages,
            week_pages,
            unique_domains: domains.len() as u64,
        })
    }
}

#[async_trait]
impl TokenRecordStore for InMemoryStore {
    async fn upsert(&self, record: TokenRecord) -> Result<(), StorageError> {
        self.check_available()?;
        if record.user_id.is_empty() {
            return Err(StorageError::invalid_input("token record needs a user id"));
        }
        self.tokens.insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<TokenRecord>, StorageError> {
        self.check_available()?;
        Ok(self.tokens.get(user_id).map(|r| r.value().clone()))
    }

    async fn count(&self) -> Result<u64, StorageError> {
        self.check_available()?;
        Ok(self.tokens.len() as u64)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn upsert(&self, user: UserRecord) -> Result<(), StorageError> {
        self.check_available()?;
        self.users.insert(user.user_id.clone(), user);
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, StorageError> {
        self.check_available()?;
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }
}
