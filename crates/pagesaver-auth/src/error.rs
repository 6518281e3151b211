//! Error types for the authentication bridge.
//!
//! Every failure of a login attempt is terminal for that attempt; nothing in
//! the bridge retries. The provider's own diagnostic text is kept verbatim so
//! the UI can show it.

use std::fmt;

use pagesaver_storage::StorageError;

/// Errors produced by the OAuth flow, token exchange, session bridge and
/// sync trigger.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The provider redirected back with an `error` parameter, or the
    /// interactive flow was closed without an answer.
    #[error("OAuth error: {error} - {description}")]
    ProviderDenied {
        /// Provider error code (`error` query parameter).
        error: String,
        /// Provider error text (`error_description` query parameter).
        description: String,
    },

    /// The returned `state` does not equal the one that was sent.
    #[error("State mismatch - possible CSRF attack")]
    CsrfMismatch,

    /// The callback carried no authorization code.
    #[error("No authorization code found in response")]
    MissingCode,

    /// The token endpoint answered with a non-2xx status.
    #[error("Token exchange failed: {status} - {body}")]
    ExchangeFailed {
        /// HTTP status returned by the token endpoint.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The profile could not be fetched with a freshly obtained token.
    #[error("Failed to fetch user info: {message}")]
    ProfileFetchFailed {
        /// What went wrong.
        message: String,
    },

    /// The session store could not destroy a session.
    #[error("Session destroy failed: {message}")]
    SessionDestroyFailed {
        /// What went wrong.
        message: String,
    },

    /// A single bookmark could not be synchronized.
    #[error("Failed to sync {url}: {message}")]
    SyncRecordFailed {
        /// Url of the failed record.
        url: String,
        /// What went wrong.
        message: String,
    },

    /// The session store failed to load or save.
    #[error("Session store error: {message}")]
    Session {
        /// What went wrong.
        message: String,
    },

    /// The request carries no usable credential.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Required configuration is missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A callback or endpoint url could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Transport-level HTTP failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Document store failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl BridgeError {
    /// Creates a `ProviderDenied` error.
    #[must_use]
    pub fn provider_denied(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::ProviderDenied {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Creates an `ExchangeFailed` error.
    #[must_use]
    pub fn exchange_failed(status: u16, body: impl Into<String>) -> Self {
        Self::ExchangeFailed {
            status,
            body: body.into(),
        }
    }

    /// Creates a `ProfileFetchFailed` error.
    #[must_use]
    pub fn profile_fetch_failed(message: impl Into<String>) -> Self {
        Self::ProfileFetchFailed {
            message: message.into(),
        }
    }

    /// Creates a `SessionDestroyFailed` error.
    #[must_use]
    pub fn session_destroy_failed(message: impl Into<String>) -> Self {
        Self::SessionDestroyFailed {
            message: message.into(),
        }
    }

    /// Creates a `SyncRecordFailed` error.
    #[must_use]
    pub fn sync_record_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SyncRecordFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a `Session` error.
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Creates a `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns `true` if this error ends the login attempt.
    ///
    /// Profile, teardown and per-record sync failures degrade instead.
    #[must_use]
    pub fn is_fatal_to_login(&self) -> bool {
        !matches!(
            self,
            Self::ProfileFetchFailed { .. }
                | Self::SessionDestroyFailed { .. }
                | Self::SyncRecordFailed { .. }
        )
    }

    /// Returns `true` for failures of the OAuth handshake itself.
    #[must_use]
    pub fn is_oauth_error(&self) -> bool {
        matches!(
            self,
            Self::ProviderDenied { .. }
                | Self::CsrfMismatch
                | Self::MissingCode
                | Self::ExchangeFailed { .. }
        )
    }

    /// Short machine-readable kind, used in redirects and JSON bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderDenied { .. } => "provider_denied",
            Self::CsrfMismatch => "csrf_mismatch",
            Self::MissingCode => "missing_code",
            Self::ExchangeFailed { .. } => "exchange_failed",
            Self::ProfileFetchFailed { .. } => "profile_fetch_failed",
            Self::SessionDestroyFailed { .. } => "session_destroy_failed",
            Self::SyncRecordFailed { .. } => "sync_record_failed",
            Self::Session { .. } => "session_error",
            Self::Unauthenticated => "unauthenticated",
            Self::Configuration(_) => "configuration_error",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Network(_) => "network_error",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderDenied { .. } | Self::CsrfMismatch | Self::MissingCode => {
                ErrorCategory::OAuth
            }
            Self::ExchangeFailed { .. } | Self::ProfileFetchFailed { .. } => {
                ErrorCategory::Provider
            }
            Self::SessionDestroyFailed { .. } | Self::Session { .. } | Self::Unauthenticated => {
                ErrorCategory::Session
            }
            Self::SyncRecordFailed { .. } => ErrorCategory::Sync,
            Self::Network(_) | Self::Storage(_) => ErrorCategory::Infrastructure,
            Self::Configuration(_) | Self::InvalidUrl(_) => ErrorCategory::Configuration,
        }
    }
}

/// Categories of bridge errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Authorization handshake failures.
    OAuth,
    /// Identity provider call failures.
    Provider,
    /// Server-side session failures.
    Session,
    /// Bookmark synchronization failures.
    Sync,
    /// Network or storage failures.
    Infrastructure,
    /// Missing or malformed settings.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OAuth => write!(f, "oauth"),
            Self::Provider => write!(f, "provider"),
            Self::Session => write!(f, "session"),
            Self::Sync => write!(f, "sync"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
