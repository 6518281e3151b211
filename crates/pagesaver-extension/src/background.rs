//! Background service: owns the extension state and serves requests,
//! browser events and periodic sync ticks from one loop.

use std::sync::Arc;

use pagesaver_auth::{OAuthFlowInitiator, SessionProbe, WebAuthFlow};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

use crate::backend::{BackendClient, PageData};
use crate::bookmarks::BookmarkSource;
use crate::config::ExtensionConfig;
use crate::coordinator::{LoginCoordinator, LoginOutcome};
use crate::credentials::{CredentialStore, KeyValueArea, SyncTick};
use crate::error::ExtensionError;
use crate::messages::{MessageClient, Reply, Request};
use crate::sync::BookmarkSync;

const CHANNEL_CAPACITY: usize = 32;

/// A browser notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Shows notifications to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// The tab a shortcut was pressed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTab {
    pub url: String,
    pub title: String,
}

/// Browser events forwarded to the background service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    BookmarkCreated,
    Shortcut { command: String, tab: ActiveTab },
}

/// Handles to a running background service.
#[derive(Debug, Clone)]
pub struct BackgroundHandle {
    pub messages: MessageClient,
    pub events: mpsc::Sender<BrowserEvent>,
}

/// Collaborators needed to start the service.
pub struct BackgroundDeps {
    pub config: ExtensionConfig,
    pub area: Arc<dyn KeyValueArea>,
    pub flow: Arc<dyn WebAuthFlow>,
    pub bookmarks: Arc<dyn BookmarkSource>,
    pub notifier: Arc<dyn Notifier>,
}

/// Extension background service.
pub struct Background {
    credentials: Arc<CredentialStore>,
    backend: BackendClient,
    coordinator: LoginCoordinator,
    sync: BookmarkSync,
    notifier: Arc<dyn Notifier>,
}

impl Background {
    /// Wires the service from its collaborators. The returned receiver
    /// carries the credential store's sync ticks.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built.
    pub fn new(deps: BackgroundDeps) -> Result<(Self, mpsc::Receiver<SyncTick>), ExtensionError> {
        let BackgroundDeps {
            config,
            area,
            flow,
            bookmarks,
            notifier,
        } = deps;

        let (tick_tx, tick_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let credentials = Arc::new(CredentialStore::new(area, tick_tx, config.sync_interval));
        let initiator = Arc::new(OAuthFlowInitiator::new(config.authorization_request(), flow));
        let backend = BackendClient::new(Arc::new(config))?;
        let sync = BookmarkSync::new(credentials.clone(), backend.clone(), bookmarks);
        let coordinator = LoginCoordinator::new(
            Arc::new(backend.clone()),
            initiator,
            Arc::new(backend.clone()),
            credentials.clone(),
            Arc::new(sync.clone()),
        );

        Ok((
            Self {
                credentials,
                backend,
                coordinator,
                sync,
                notifier,
            },
            tick_rx,
        ))
    }

    /// Starts the service loop on the runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be built.
    pub fn start(deps: BackgroundDeps) -> Result<(BackgroundHandle, JoinHandle<()>), ExtensionError> {
        let (service, ticks) = Self::new(deps)?;
        let (request_tx, request_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(service.run(request_rx, event_rx, ticks));
        Ok((
            BackgroundHandle {
                messages: MessageClient::new(request_tx),
                events: event_tx,
            },
            task,
        ))
    }

    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Serves until every request sender is dropped.
    ///
    /// Each request, event and tick runs as its own task, so a login
    /// waiting on the authorization window does not hold up the others.
    /// In-flight tasks are awaited before returning.
    pub async fn run(
        self,
        mut requests: mpsc::Receiver<Request>,
        mut events: mpsc::Receiver<BrowserEvent>,
        mut ticks: mpsc::Receiver<SyncTick>,
    ) {
        tracing::info!("Background service started");
        let service = Arc::new(self);
        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(request) => {
                        let service = Arc::clone(&service);
                        tasks.spawn(async move { service.handle(request).await });
                    }
                    None => break,
                },
                Some(event) = events.recv() => {
                    let service = Arc::clone(&service);
                    tasks.spawn(async move { service.on_event(event).await });
                }
                Some(SyncTick) = ticks.recv() => {
                    let service = Arc::clone(&service);
                    tasks.spawn(async move { service.on_tick().await });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Background task failed");
                    }
                }
            }
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Background task failed");
            }
        }
        service.credentials.stop_periodic_sync();
        tracing::info!("Background service stopped");
    }

    async fn handle(&self, request: Request) {
        tracing::debug!(request = request.name(), "Handling request");
        // A dropped receiver means the caller went away.
        match request {
            Request::SavePage { page, reply } => {
                let _ = reply.send(Reply::from_unit(self.save_page(&page).await));
            }
            Request::Login { reply } => {
                let _ = reply.send(Reply::from_result(self.login().await));
            }
            Request::CheckSession { reply } => {
                let _ = reply.send(Reply::from_result(self.check_session().await));
            }
            Request::Logout { reply } => {
                let _ = reply.send(Reply::from_unit(self.logout().await));
            }
        }
    }

    pub async fn login(&self) -> Result<LoginOutcome, ExtensionError> {
        self.coordinator.login().await.inspect_err(|e| {
            tracing::warn!(error = %e, "Login failed");
        })
    }

    pub async fn check_session(&self) -> Result<SessionProbe, ExtensionError> {
        self.backend.probe_session().await
    }

    /// Saves a page with the stored token and keeps a local backup.
    pub async fn save_page(&self, page: &PageData) -> Result<(), ExtensionError> {
        let token = self
            .credentials
            .access_token()
            .await?
            .ok_or(ExtensionError::NotLoggedIn)?;
        self.backend.save_page(&token, page).await?;
        self.credentials.append_saved_page(page).await?;
        tracing::info!(url = %page.url, "Page saved");
        Ok(())
    }

    /// Stops the timer, clears the credential, then ends the backend session.
    ///
    /// The credential is gone even when the backend call fails. An error
    /// status from the backend still counts as logged out; only an
    /// unreachable backend is reported.
    pub async fn logout(&self) -> Result<(), ExtensionError> {
        let cleared = self.credentials.clear_credential().await;
        let remote = self.backend.logout().await;
        if let Err(e) = &remote {
            tracing::warn!(error = %e, "Backend logout failed");
        }
        cleared?;
        remote
    }

    pub async fn on_tick(&self) {
        if let Err(e) = self.sync.sync_all().await {
            tracing::warn!(error = %e, "Periodic sync failed");
        }
    }

    pub async fn on_event(&self, event: BrowserEvent) {
        match event {
            BrowserEvent::BookmarkCreated => {
                if let Err(e) = self.sync.sync_if_logged_in().await {
                    tracing::warn!(error = %e, "Bookmark sync failed");
                }
            }
            BrowserEvent::Shortcut { command, tab } => self.on_shortcut(&command, &tab).await,
        }
    }

    async fn on_shortcut(&self, command: &str, tab: &ActiveTab) {
        match self.credentials.access_token().await {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.notifier.notify(Notification::new(
                    "Login Required",
                    "Please login with LinkedIn first to save pages.",
                ));
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not read credential");
                return;
            }
        }

        let page = shortcut_page(command, tab);
        match self.save_page(&page).await {
            Ok(()) => self
                .notifier
                .notify(Notification::new("Page Saved", tab.title.clone())),
            Err(e) => self
                .notifier
                .notify(Notification::new("Save Failed", e.to_string())),
        }
    }
}

fn shortcut_page(command: &str, tab: &ActiveTab) -> PageData {
    let host = Url::parse(&tab.url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| "unknown".to_string());
    PageData {
        url: tab.url.clone(),
        title: tab.title.clone(),
        timestamp: pagesaver_auth::sync::now_millis(),
        description: Some(format!(
            "Saved via keyboard shortcut ({command}) from {host}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use pagesaver_auth::{AccessCredential, BridgeError};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::bookmarks::{BookmarkNode, StaticBookmarks};
    use crate::credentials::MemoryArea;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    impl Notifier for Recorder {
        fn notify(&self, notification: Notification) {
            self.0.lock().unwrap().push(notification);
        }
    }

    struct ClosedFlow;

    #[async_trait]
    impl WebAuthFlow for ClosedFlow {
        async fn launch(&self, _url: Url) -> Result<Url, BridgeError> {
            Err(BridgeError::provider_denied("closed", "window closed"))
        }
    }

    /// An authorization window the user never finishes.
    struct OpenWindow;

    #[async_trait]
    impl WebAuthFlow for OpenWindow {
        async fn launch(&self, _url: Url) -> Result<Url, BridgeError> {
            std::future::pending::<Result<Url, BridgeError>>().await
        }
    }

    fn service(
        server: &MockServer,
        notifier: Arc<Recorder>,
    ) -> (Background, mpsc::Receiver<SyncTick>) {
        let config = ExtensionConfig {
            api_endpoint: format!("{}/api", server.uri()),
            extension_id: "ext".to_string(),
            client_id: "client-1".to_string(),
            ..ExtensionConfig::default()
        };
        Background::new(BackgroundDeps {
            config,
            area: Arc::new(MemoryArea::new()),
            flow: Arc::new(ClosedFlow),
            bookmarks: Arc::new(StaticBookmarks::new(vec![BookmarkNode::bookmark(
                "A",
                "https://a.com",
            )])),
            notifier,
        })
        .unwrap()
    }

    async fn log_in(service: &Background) {
        service
            .credentials()
            .set_credential(&AccessCredential::issued_now("tok", 60), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_logout_succeeds_when_backend_answers_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/logout"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
            .expect(1)
            .mount(&server)
            .await;
        let (service, _ticks) = service(&server, Arc::default());
        log_in(&service).await;

        service.logout().await.unwrap();
        assert!(service.credentials().access_token().await.unwrap().is_none());
        assert!(!service.credentials().is_periodic_sync_running());
    }

    #[tokio::test]
    async fn test_logout_reports_unreachable_backend() {
        let (service, _ticks) = Background::new(BackgroundDeps {
            config: ExtensionConfig {
                api_endpoint: "http://127.0.0.1:1/api".to_string(),
                extension_id: "ext".to_string(),
                client_id: "client-1".to_string(),
                ..ExtensionConfig::default()
            },
            area: Arc::new(MemoryArea::new()),
            flow: Arc::new(ClosedFlow),
            bookmarks: Arc::new(StaticBookmarks::default()),
            notifier: Arc::new(Recorder::default()),
        })
        .unwrap();
        log_in(&service).await;

        let err = service.logout().await.unwrap_err();
        assert!(matches!(err, ExtensionError::Network(_)));
        assert!(service.credentials().access_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_page_requires_token() {
        let server = MockServer::start().await;
        let (service, _ticks) = service(&server, Arc::default());
        let page = PageData {
            url: "https://a.com".to_string(),
            title: "A".to_string(),
            timestamp: 1,
            description: None,
        };
        let err = service.save_page(&page).await.unwrap_err();
        assert!(matches!(err, ExtensionError::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_shortcut_without_token_asks_for_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pages/token"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        let notifier = Arc::new(Recorder::default());
        let (service, _ticks) = service(&server, notifier.clone());

        service
            .on_event(BrowserEvent::Shortcut {
                command: "save-page".to_string(),
                tab: ActiveTab {
                    url: "https://example.com/a".to_string(),
                    title: "Example".to_string(),
                },
            })
            .await;

        let seen = notifier.0.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].title, "Login Required");
    }

    #[tokio::test]
    async fn test_shortcut_saves_with_description_and_backs_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pages/token"))
            .and(body_partial_json(json!({
                "pageData": {
                    "url": "https://example.com/a",
                    "description": "Saved via keyboard shortcut (save-page) from example.com"
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;
        let notifier = Arc::new(Recorder::default());
        let (service, _ticks) = service(&server, notifier.clone());
        log_in(&service).await;

        service
            .on_event(BrowserEvent::Shortcut {
                command: "save-page".to_string(),
                tab: ActiveTab {
                    url: "https://example.com/a".to_string(),
                    title: "Example".to_string(),
                },
            })
            .await;

        assert_eq!(notifier.0.lock().unwrap()[0].title, "Page Saved");
        assert_eq!(service.credentials().saved_pages().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tick_syncs_bookmarks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pages/bookmarks/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "synced": 1, "skipped": 0})),
            )
            .expect(1)
            .mount(&server)
            .await;
        let (service, _ticks) = service(&server, Arc::default());
        log_in(&service).await;

        service.on_tick().await;
    }

    #[tokio::test]
    async fn test_closed_auth_window_reports_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/session/validate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authenticated": false})))
            .mount(&server)
            .await;
        let (handle, task) = Background::start(BackgroundDeps {
            config: ExtensionConfig {
                api_endpoint: format!("{}/api", server.uri()),
                extension_id: "ext".to_string(),
                client_id: "client-1".to_string(),
                ..ExtensionConfig::default()
            },
            area: Arc::new(MemoryArea::new()),
            flow: Arc::new(ClosedFlow),
            bookmarks: Arc::new(StaticBookmarks::default()),
            notifier: Arc::new(Recorder::default()),
        })
        .unwrap();

        let session = handle.messages.check_session().await;
        assert!(session.success);
        assert_eq!(session.data, Some(SessionProbe::anonymous()));

        let reply = handle.messages.login().await;
        assert!(!reply.success);
        assert_eq!(
            reply.error.as_deref(),
            Some("OAuth error: closed - window closed")
        );

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_requests_are_served_while_login_window_is_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/session/validate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authenticated": false})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/logout"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let (handle, _task) = Background::start(BackgroundDeps {
            config: ExtensionConfig {
                api_endpoint: format!("{}/api", server.uri()),
                extension_id: "ext".to_string(),
                client_id: "client-1".to_string(),
                ..ExtensionConfig::default()
            },
            area: Arc::new(MemoryArea::new()),
            flow: Arc::new(OpenWindow),
            bookmarks: Arc::new(StaticBookmarks::default()),
            notifier: Arc::new(Recorder::default()),
        })
        .unwrap();

        let messages = handle.messages.clone();
        let login = tokio::spawn(async move { messages.login().await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let session = tokio::time::timeout(Duration::from_secs(3), handle.messages.check_session())
            .await
            .expect("check_session blocked by pending login");
        assert!(session.success);

        let logout = tokio::time::timeout(Duration::from_secs(3), handle.messages.logout())
            .await
            .expect("logout blocked by pending login");
        assert!(logout.success);
        assert!(!login.is_finished());
        login.abort();
    }
}
