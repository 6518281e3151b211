use std::sync::Arc;

use pagesaver_auth::InMemorySessionStore;
use pagesaver_server::{AppConfig, AppState, build_app, build_app_with_state};
use pagesaver_storage::{InMemoryStore, PageStore, TokenRecordStore, UserStore};
use reqwest::{Client, StatusCode, header, redirect};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use wiremock::matchers::{body_string_contains, header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestServer {
    base: String,
    store: Arc<InMemoryStore>,
    shutdown: tokio::sync::oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

fn test_config(provider: &MockServer) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.linkedin.client_id = "client-1".to_string();
    cfg.linkedin.client_secret = Some("secret".to_string());
    cfg.linkedin.token_endpoint = format!("{}/oauth/v2/accessToken", provider.uri());
    cfg.linkedin.userinfo_endpoint = format!("{}/v2/userinfo", provider.uri());
    cfg.linkedin.authorization_endpoint = format!("{}/oauth/v2/authorization", provider.uri());
    cfg
}

async fn start_server(cfg: AppConfig) -> TestServer {
    let store = Arc::new(InMemoryStore::new());
    let state = AppState::new(&cfg, store.clone(), Arc::new(InMemorySessionStore::new()));
    let app = build_app_with_state(&cfg, state);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        store,
        shutdown: tx,
        handle,
    }
}

/// Browser-like client: keeps cookies, does not follow redirects.
fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .unwrap()
}

async fn mount_provider(provider: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth/v2/accessToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "expires_in": 5184000,
            "token_type": "Bearer"
        })))
        .mount(provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/userinfo"))
        .and(header_is("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "sub-1",
            "localizedFirstName": "Ada",
            "localizedLastName": "Lovelace",
            "email": "ada@example.com"
        })))
        .mount(provider)
        .await;
}

async fn exchange(client: &Client, base: &str) -> reqwest::Response {
    client
        .post(format!("{base}/api/linkedin/token"))
        .json(&json!({
            "code": "abc",
            "redirectUri": "https://ext.chromiumapp.org/",
            "clientId": "client-1"
        }))
        .send()
        .await
        .unwrap()
}

async fn probe(client: &Client, base: &str) -> Value {
    client
        .get(format!("{base}/api/session/validate"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn public_endpoints_and_auth_guards() {
    let provider = MockServer::start().await;
    let server = start_server(test_config(&provider)).await;
    let client = browser();
    let base = &server.base;

    let resp = client.get(format!("{base}/api/health")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["timestamp"].is_string());

    let body = probe(&client, base).await;
    assert_eq!(body, json!({"authenticated": false}));

    let resp = client.get(format!("{base}/api/pages")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);

    let resp = client.get(format!("{base}/dashboard")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/login");

    let resp = client.get(format!("{base}/login")).send().await.unwrap();
    assert!(resp.status().is_success());
    assert!(resp.text().await.unwrap().contains("/auth/linkedin"));

    let resp = client.get(format!("{base}/nope")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn token_exchange_establishes_session_and_logout_ends_it() {
    let provider = MockServer::start().await;
    mount_provider(&provider, "tok-1").await;
    let server = start_server(test_config(&provider)).await;
    let client = browser();
    let base = &server.base;

    let resp = exchange(&client, base).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["access_token"], "tok-1");
    assert_eq!(body["expires_in"], 5184000);
    assert_eq!(body["userId"], "sub-1");
    assert_eq!(body["name"], "Ada Lovelace");

    let body = probe(&client, base).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["id"], "sub-1");
    assert_eq!(body["user"]["email"], "ada@example.com");

    assert_eq!(TokenRecordStore::count(server.store.as_ref()).await.unwrap(), 1);
    assert!(UserStore::get(server.store.as_ref(), "sub-1").await.unwrap().is_some());

    // A second exchange for the same subject overwrites the record.
    exchange(&client, base).await;
    assert_eq!(TokenRecordStore::count(server.store.as_ref()).await.unwrap(), 1);

    let resp = client.get(format!("{base}/logout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/login");

    let body = probe(&client, base).await;
    assert_eq!(body["authenticated"], false);

    server.stop().await;
}

#[tokio::test]
async fn token_exchange_failures() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/accessToken"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&provider)
        .await;
    let server = start_server(test_config(&provider)).await;
    let client = browser();
    let base = &server.base;

    let resp = exchange(&client, base).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "LinkedIn token exchange failed: invalid_grant");

    let resp = client
        .post(format!("{base}/api/linkedin/token"))
        .json(&json!({"code": "abc"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Missing required parameters: code, redirectUri, clientId"
    );

    assert_eq!(probe(&client, base).await["authenticated"], false);

    server.stop().await;
}

#[tokio::test]
async fn missing_client_secret_is_a_server_error() {
    let provider = MockServer::start().await;
    let mut cfg = test_config(&provider);
    cfg.linkedin.client_secret = None;
    let server = start_server(cfg).await;

    let resp = exchange(&browser(), &server.base).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    server.stop().await;
}

#[tokio::test]
async fn bookmark_sync_with_bearer_token() {
    let provider = MockServer::start().await;
    mount_provider(&provider, "ext-tok").await;
    Mock::given(method("GET"))
        .and(path("/v2/userinfo"))
        .and(header_is("authorization", "Bearer session_based"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sub": "nobody"})))
        .expect(0)
        .mount(&provider)
        .await;
    let server = start_server(test_config(&provider)).await;
    let client = Client::new();
    let base = &server.base;
    let url = format!("{base}/api/pages/bookmarks/token");

    let bookmarks = json!({"bookmarks": [
        {"url": "https://a.com", "title": "A"},
        {"url": "https://a.com", "title": "A dup"},
        {"url": "https://b.com"}
    ]});
    let resp = client
        .post(&url)
        .bearer_auth("ext-tok")
        .json(&bookmarks)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["synced"], 2);
    assert_eq!(body["skipped"], 1);

    let untitled = server.store.find_by_url("https://b.com").await.unwrap().unwrap();
    assert_eq!(untitled.title, "Untitled");

    // The placeholder never reaches the provider and is rejected without a cookie.
    let resp = client
        .post(&url)
        .bearer_auth("session_based")
        .json(&bookmarks)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client.post(&url).json(&bookmarks).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    server.stop().await;
}

#[tokio::test]
async fn page_crud_with_cookie_session() {
    let provider = MockServer::start().await;
    mount_provider(&provider, "tok-1").await;
    let server = start_server(test_config(&provider)).await;
    let client = browser();
    let base = &server.base;
    exchange(&client, base).await;

    let resp = client
        .post(format!("{base}/api/pages"))
        .json(&json!({"url": "https://a.com/x", "title": "X", "timestamp": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("{base}/api/pages"))
        .json(&json!({"url": "https://a.com/y"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Session cookie also authorizes the extension route.
    let resp = client
        .post(format!("{base}/api/pages/token"))
        .bearer_auth("session_based")
        .json(&json!({"pageData": {"url": "https://b.com", "title": "B", "timestamp": 2}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = client
        .get(format!("{base}/api/pages?limit=10"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let body: Value = client
        .get(format!("{base}/api/pages/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["totalPages"], 2);
    assert_eq!(body["data"]["uniqueDomains"], 2);

    let body: Value = client
        .get(format!("{base}/api/user"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["user"]["id"], "sub-1");

    let resp = client
        .delete(format!("{base}/api/pages/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = client
        .delete(format!("{base}/api/pages/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Page not found");

    let resp = client.get(format!("{base}/dashboard")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("Welcome, Ada Lovelace"));

    server.stop().await;
}

fn state_from_location(location: &str) -> String {
    let url = reqwest::Url::parse(location).unwrap();
    url.query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap()
}

#[tokio::test]
async fn dashboard_login_checks_state() {
    let provider = MockServer::start().await;
    mount_provider(&provider, "tok-1").await;
    let server = start_server(test_config(&provider)).await;
    let client = browser();
    let base = &server.base;

    let resp = client.get(format!("{base}/auth/linkedin")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.contains("response_type=code"));
    assert!(location.contains("client_id=client-1"));
    let state = state_from_location(&location);

    // Wrong state: rejected, and the real one is consumed with it.
    let resp = client
        .get(format!("{base}/auth/linkedin/callback?code=abc&state=forged"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()[header::LOCATION], "/login?error=csrf_mismatch");
    let resp = client
        .get(format!("{base}/auth/linkedin/callback?code=abc&state={state}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()[header::LOCATION], "/login?error=csrf_mismatch");

    // Provider error.
    let resp = client.get(format!("{base}/auth/linkedin")).send().await.unwrap();
    let state = state_from_location(resp.headers()[header::LOCATION].to_str().unwrap());
    let resp = client
        .get(format!(
            "{base}/auth/linkedin/callback?error=access_denied&error_description=no&state={state}"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()[header::LOCATION], "/login?error=provider_denied");

    // Successful round trip.
    let resp = client.get(format!("{base}/auth/linkedin")).send().await.unwrap();
    let state = state_from_location(resp.headers()[header::LOCATION].to_str().unwrap());
    let resp = client
        .get(format!("{base}/auth/linkedin/callback?code=abc&state={state}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/dashboard");

    let body = probe(&client, base).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["name"], "Ada Lovelace");

    server.stop().await;
}

#[tokio::test]
async fn exchange_form_carries_client_secret() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/accessToken"))
        .and(body_string_contains("client_secret=secret"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-2",
            "expires_in": 60
        })))
        .expect(1)
        .mount(&provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/userinfo"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&provider)
        .await;
    let server = start_server(test_config(&provider)).await;
    let client = browser();

    // Profile failure keeps the token but no session is established.
    let resp = exchange(&client, &server.base).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["access_token"], "tok-2");
    assert!(body["userId"].is_null());
    assert_eq!(probe(&client, &server.base).await["authenticated"], false);

    server.stop().await;
}

#[tokio::test]
async fn default_app_builds() {
    let provider = MockServer::start().await;
    let _app = build_app(&test_config(&provider));
}
