//! Typed request/response channel between extension surfaces and the
//! background service.

use pagesaver_auth::SessionProbe;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::backend::PageData;
use crate::coordinator::LoginOutcome;
use crate::error::ExtensionError;

/// Response payload: `{success, data?, error?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Reply<T> {
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(error: &ExtensionError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }

    #[must_use]
    pub fn from_result(result: Result<T, ExtensionError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(&e),
        }
    }
}

impl Reply<()> {
    /// `{success: true}` without data.
    #[must_use]
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    #[must_use]
    pub fn from_unit(result: Result<(), ExtensionError>) -> Self {
        match result {
            Ok(()) => Self::done(),
            Err(e) => Self::failure(&e),
        }
    }
}

/// Requests handled by the background service.
#[derive(Debug)]
pub enum Request {
    SavePage {
        page: PageData,
        reply: oneshot::Sender<Reply<()>>,
    },
    Login {
        reply: oneshot::Sender<Reply<LoginOutcome>>,
    },
    CheckSession {
        reply: oneshot::Sender<Reply<SessionProbe>>,
    },
    Logout {
        reply: oneshot::Sender<Reply<()>>,
    },
}

impl Request {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SavePage { .. } => "savePage",
            Self::Login { .. } => "login",
            Self::CheckSession { .. } => "checkSession",
            Self::Logout { .. } => "logout",
        }
    }
}

/// Sending side used by the popup and content surfaces.
#[derive(Debug, Clone)]
pub struct MessageClient {
    tx: mpsc::Sender<Request>,
}

impl MessageClient {
    #[must_use]
    pub fn new(tx: mpsc::Sender<Request>) -> Self {
        Self { tx }
    }

    pub async fn save_page(&self, page: PageData) -> Reply<()> {
        self.call(|reply| Request::SavePage { page, reply }).await
    }

    pub async fn login(&self) -> Reply<LoginOutcome> {
        self.call(|reply| Request::Login { reply }).await
    }

    pub async fn check_session(&self) -> Reply<SessionProbe> {
        self.call(|reply| Request::CheckSession { reply }).await
    }

    pub async fn logout(&self) -> Reply<()> {
        self.call(|reply| Request::Logout { reply }).await
    }

    async fn call<T>(&self, build: impl FnOnce(oneshot::Sender<Reply<T>>) -> Request) -> Reply<T> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(build(reply)).await.is_err() {
            return Reply::failure(&ExtensionError::ChannelClosed);
        }
        rx.await
            .unwrap_or_else(|_| Reply::failure(&ExtensionError::ChannelClosed))
    }
}
