//! Extension-side error types.

use pagesaver_auth::BridgeError;

/// Errors surfaced to the extension UI.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    /// An OAuth, exchange or session failure, passed through unchanged.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The action needs a stored access token.
    #[error("No access token found. Please login first.")]
    NotLoggedIn,

    /// The backend answered with a non-2xx status.
    #[error("Backend request failed: {status} - {message}")]
    Backend {
        /// HTTP status.
        status: u16,
        /// Error text from the body, or the raw body.
        message: String,
    },

    /// Local key-value storage failed.
    #[error("Local storage error: {0}")]
    Storage(String),

    /// The bookmark API is unavailable.
    #[error("Bookmarks unavailable: {0}")]
    Bookmarks(String),

    /// Transport-level HTTP failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The background service is gone.
    #[error("Background channel closed")]
    ChannelClosed,
}

impl ExtensionError {
    /// Creates a `Backend` error.
    #[must_use]
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    /// Creates a `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Returns `true` if the user has to log in (again).
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::NotLoggedIn
                | Self::Backend { status: 401, .. }
                | Self::Bridge(BridgeError::Unauthenticated)
        )
    }
}
