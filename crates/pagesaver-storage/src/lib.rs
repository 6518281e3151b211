//! # pagesaver-storage
//!
//! Document store used by the Page Saver backend.
//!
//! The store is a collaborator of the authentication bridge, not part of
//! it: it exposes insert/find/delete/count over three collections.
//!
//! - [`PageStore`] - saved pages and bookmarks
//! - [`TokenRecordStore`] - the persisted token record per subject (upsert)
//! - [`UserStore`] - profile snapshots of users who logged in
//!
//! [`InMemoryStore`] implements all of them.
//!
//! ## Example
//!
//! ```ignore
//! use pagesaver_storage::{InMemoryStore, NewPage, PageStore};
//!
//! let store = InMemoryStore::new();
//! let page = store.insert(NewPage::new("https://a.com", "A", 0)).await?;
//! assert!(store.find_by_url("https://a.com").await?.is_some());
//! ```

mod error;
mod memory;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use memory::InMemoryStore;
pub use traits::{PageStore, TokenRecordStore, UserStore};
pub use types::{NewPage, PageStats, SavedPage, TokenRecord, UserRecord};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Shared page store handle.
pub type DynPageStore = std::sync::Arc<dyn PageStore>;

/// Shared token record store handle.
pub type DynTokenRecordStore = std::sync::Arc<dyn TokenRecordStore>;

/// Shared user store handle.
pub type DynUserStore = std::sync::Arc<dyn UserStore>;
