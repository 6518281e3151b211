//! # pagesaver-extension
//!
//! The extension-local side of Page Saver.
//!
//! ## Modules
//!
//! - [`credentials`] - Credential Store with the owned periodic sync timer
//! - [`backend`] - HTTP client for the backend API
//! - [`coordinator`] - Unified Login Coordinator
//! - [`bookmarks`] / [`sync`] - bookmark tree flattening and upload
//! - [`messages`] - typed request/response channel
//! - [`background`] - the service loop tying it together
//! - [`platform`] - hostname-selected platform adapters

pub mod background;
pub mod backend;
pub mod bookmarks;
pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod messages;
pub mod platform;
pub mod sync;

pub use background::{
    ActiveTab, Background, BackgroundDeps, BackgroundHandle, BrowserEvent, Notification, Notifier,
};
pub use backend::{BackendClient, PageData};
pub use bookmarks::{BookmarkNode, BookmarkSource, StaticBookmarks, flatten_bookmarks};
pub use config::ExtensionConfig;
pub use coordinator::{LoginCoordinator, LoginOutcome};
pub use credentials::{CredentialStore, KeyValueArea, MemoryArea, StoredCredential, SyncTick};
pub use error::ExtensionError;
pub use messages::{MessageClient, Reply, Request};
pub use platform::{AdapterRegistry, PageContext, PlatformAdapter};
pub use sync::BookmarkSync;

/// Type alias for extension results.
pub type ExtensionResult<T> = Result<T, ExtensionError>;
