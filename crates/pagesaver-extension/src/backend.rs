//! HTTP client for the Page Saver backend.
//!
//! The client keeps a cookie store so the session cookie set by the token
//! exchange rides along on later calls, the way the browser does for the
//! extension.

use std::sync::Arc;

use pagesaver_auth::http::{TokenExchangeRequest, TokenExchangeResponse};
use pagesaver_auth::{BookmarkRecord, BridgeError, SESSION_BASED_TOKEN, SessionProbe, SyncSummary};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::ExtensionConfig;
use crate::error::ExtensionError;

/// A page as captured by the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    pub url: String,
    pub title: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SyncReply {
    #[serde(default)]
    synced: u64,
    #[serde(default)]
    skipped: u64,
}

/// Backend API client.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    config: Arc<ExtensionConfig>,
}

impl BackendClient {
    /// Creates a client with its own cookie store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: Arc<ExtensionConfig>) -> Result<Self, ExtensionError> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_http_client(config, http))
    }

    #[must_use]
    pub fn with_http_client(config: Arc<ExtensionConfig>, http: Client) -> Self {
        Self { http, config }
    }

    #[must_use]
    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    /// `GET /session/validate`.
    pub async fn probe_session(&self) -> Result<SessionProbe, ExtensionError> {
        let response = self
            .http
            .get(self.config.api_url("/session/validate"))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// `POST /linkedin/token`: the backend exchanges the code.
    ///
    /// A non-2xx answer becomes [`BridgeError::ExchangeFailed`] carrying
    /// the backend status and error text.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenExchangeResponse, ExtensionError> {
        let body = TokenExchangeRequest {
            code: Some(code.to_string()),
            redirect_uri: Some(redirect_uri.to_string()),
            client_id: Some(self.config.client_id.clone()),
        };
        let response = self
            .http
            .post(self.config.api_url("/linkedin/token"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_text(response).await;
            return Err(BridgeError::exchange_failed(status.as_u16(), message).into());
        }
        Ok(response.json().await?)
    }

    /// `GET /logout`.
    ///
    /// A non-2xx answer is logged and treated as done; only transport
    /// failures are errors.
    pub async fn logout(&self) -> Result<(), ExtensionError> {
        let response = self.http.get(self.config.api_url("/logout")).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Backend logout answered with an error status");
        }
        Ok(())
    }

    /// `POST /pages/token` with `{pageData}`.
    pub async fn save_page(&self, token: &str, page: &PageData) -> Result<(), ExtensionError> {
        let request = self
            .http
            .post(self.config.api_url("/pages/token"))
            .json(&json!({ "pageData": page }));
        let response = authorize(request, token).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// `POST /pages/bookmarks/token` with `{bookmarks}`.
    pub async fn sync_bookmarks(
        &self,
        token: &str,
        bookmarks: &[BookmarkRecord],
    ) -> Result<SyncSummary, ExtensionError> {
        let request = self
            .http
            .post(self.config.api_url("/pages/bookmarks/token"))
            .json(&json!({ "bookmarks": bookmarks }));
        let response = authorize(request, token).send().await?;
        let reply: SyncReply = ensure_success(response).await?.json().await?;
        Ok(SyncSummary {
            synced: reply.synced,
            skipped: reply.skipped,
        })
    }
}

/// Adds the bearer header. The placeholder is left off; the session cookie
/// authorizes those calls.
fn authorize(request: RequestBuilder, token: &str) -> RequestBuilder {
    if token == SESSION_BASED_TOKEN {
        request
    } else {
        request.bearer_auth(token)
    }
}

async fn ensure_success(response: Response) -> Result<Response, ExtensionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = error_text(response).await;
    tracing::warn!(status = status.as_u16(), error = %message, "Backend request failed");
    Err(ExtensionError::backend(status.as_u16(), message))
}

/// The `error` field of a JSON body, or the raw body.
async fn error_text(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> BackendClient {
        let config = ExtensionConfig {
            api_endpoint: format!("{}/api", server.uri()),
            extension_id: "ext".to_string(),
            client_id: "client-1".to_string(),
            ..ExtensionConfig::default()
        };
        BackendClient::new(Arc::new(config)).unwrap()
    }

    #[tokio::test]
    async fn test_probe_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/session/validate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "authenticated": true,
                "user": {"id": "sub-1", "name": "Ada"}
            })))
            .mount(&server)
            .await;

        let probe = client(&server).probe_session().await.unwrap();
        assert!(probe.authenticated);
        assert_eq!(probe.user.unwrap().id, "sub-1");
    }

    #[tokio::test]
    async fn test_exchange_sends_code_and_client_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/linkedin/token"))
            .and(body_json(json!({
                "code": "abc",
                "redirectUri": "https://ext.chromiumapp.org/",
                "clientId": "client-1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "access_token": "tok",
                "expires_in": 5184000,
                "token_type": "Bearer",
                "userId": "sub-1",
                "name": "Ada"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server)
            .exchange_code("abc", "https://ext.chromiumapp.org/")
            .await
            .unwrap();
        assert_eq!(reply.access_token, "tok");
        assert_eq!(reply.user_id.as_deref(), Some("sub-1"));
    }

    #[tokio::test]
    async fn test_exchange_failure_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/linkedin/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "error": "LinkedIn token exchange failed: invalid_grant"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .exchange_code("bad", "https://ext.chromiumapp.org/")
            .await
            .unwrap_err();
        match err {
            ExtensionError::Bridge(BridgeError::ExchangeFailed { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_page_uses_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pages/token"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let page = PageData {
            url: "https://a.com".to_string(),
            title: "A".to_string(),
            timestamp: 1,
            description: None,
        };
        client(&server).save_page("tok", &page).await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_save_requires_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pages/token"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"success": false, "error": "Authentication required"})),
            )
            .mount(&server)
            .await;

        let page = PageData {
            url: "https://a.com".to_string(),
            title: "A".to_string(),
            timestamp: 1,
            description: None,
        };
        let err = client(&server).save_page("tok", &page).await.unwrap_err();
        assert!(err.requires_login());
        assert_eq!(
            err.to_string(),
            "Backend request failed: 401 - Authentication required"
        );
    }

    #[tokio::test]
    async fn test_sync_bookmarks_returns_counts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pages/bookmarks/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "synced": 2, "skipped": 1
            })))
            .mount(&server)
            .await;

        let summary = client(&server)
            .sync_bookmarks("tok", &[BookmarkRecord::new("https://a.com", "A")])
            .await
            .unwrap();
        assert_eq!(summary, SyncSummary { synced: 2, skipped: 1 });
    }
}
