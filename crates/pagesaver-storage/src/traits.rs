//! Store traits implemented by every backend.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::types::{NewPage, PageStats, SavedPage, TokenRecord, UserRecord};

/// Storage for saved pages.
///
/// Implementations must be thread-safe; handlers share a single store
/// behind an `Arc`.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Inserts a page, assigning an id and setting both timestamps to now.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    async fn insert(&self, page: NewPage) -> Result<SavedPage, StorageError>;

    /// Inserts `page` unless a page with the same url exists. Returns
    /// `None` when one does.
    ///
    /// The check and the insert are atomic with respect to other
    /// `insert_if_absent` calls for the same url.
    async fn insert_if_absent(&self, page: NewPage) -> Result<Option<SavedPage>, StorageError>;

    /// Finds the first page saved under `url`.
    async fn find_by_url(&self, url: &str) -> Result<Option<SavedPage>, StorageError>;

    /// Lists pages newest first, skipping `skip` and returning at most `limit`.
    async fn list(&self, limit: usize, skip: usize) -> Result<Vec<SavedPage>, StorageError>;

    /// Deletes a page by id. Returns `false` when nothing was deleted.
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;

    /// Counts all pages.
    async fn count(&self) -> Result<u64, StorageError>;

    /// Counts pages created at or after `since`.
    async fn count_since(&self, since: OffsetDateTime) -> Result<u64, StorageError>;

    /// Computes dashboard statistics.
    async fn stats(&self) -> Result<PageStats, StorageError>;
}

/// Storage for persisted token records.
///
/// This is an audit trail; authorization never consults it.
#[async_trait]
pub trait TokenRecordStore: Send + Sync {
    /// Inserts or replaces the record for `record.user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    async fn upsert(&self, record: TokenRecord) -> Result<(), StorageError>;

    /// Gets the record for a subject.
    async fn get(&self, user_id: &str) -> Result<Option<TokenRecord>, StorageError>;

    /// Counts stored records.
    async fn count(&self) -> Result<u64, StorageError>;
}

/// Storage for user profile snapshots.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts or replaces the user keyed by `user.user_id`.
    async fn upsert(&self, user: UserRecord) -> Result<(), StorageError>;

    /// Gets a user by subject id.
    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, StorageError>;
}
