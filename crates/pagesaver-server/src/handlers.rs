use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use pagesaver_auth::BookmarkRecord;
use pagesaver_auth::http::json_error;
use pagesaver_storage::{NewPage, PageStore, StorageError};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::middleware::CurrentUser;
use crate::server::AppState;
use crate::templates;

const DEFAULT_LIMIT: usize = 100;

/// Page payload as sent by the dashboard and the extension.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePayload {
    pub url: Option<String>,
    pub title: Option<String>,
    pub timestamp: Option<i64>,
    pub description: Option<String>,
}

impl PagePayload {
    fn into_new_page(self) -> Option<NewPage> {
        let url = self.url.filter(|u| !u.is_empty())?;
        let title = self.title.filter(|t| !t.is_empty())?;
        let timestamp = self
            .timestamp
            .unwrap_or_else(pagesaver_auth::sync::now_millis);
        Some(NewPage::new(url, title, timestamp).with_description(self.description.unwrap_or_default()))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSaveBody {
    pub page_data: Option<PagePayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookmarkSyncBody {
    pub bookmarks: Option<Vec<BookmarkRecord>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    pub error: Option<String>,
}

fn storage_error(e: &StorageError) -> Response {
    tracing::error!(error = %e, category = %e.category(), "Storage operation failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Page Saver API is running",
        "timestamp": now_rfc3339(),
    }))
}

pub async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Route not found")
}

async fn save(state: &AppState, payload: PagePayload) -> Response {
    let Some(page) = payload.into_new_page() else {
        return json_error(StatusCode::BAD_REQUEST, "Missing required fields: url, title");
    };
    match state.pages.insert(page).await {
        Ok(saved) => {
            tracing::info!(page_id = %saved.id, url = %saved.url, "Page saved");
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": "Page saved successfully",
                    "data": saved,
                })),
            )
                .into_response()
        }
        Err(e) => storage_error(&e),
    }
}

/// `POST /api/pages`
pub async fn create_page(State(state): State<AppState>, Json(payload): Json<PagePayload>) -> Response {
    save(&state, payload).await
}

/// `POST /api/pages/token`
pub async fn create_page_with_token(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<TokenSaveBody>,
) -> Response {
    let Some(payload) = body.page_data else {
        return json_error(StatusCode::BAD_REQUEST, "Missing pageData");
    };
    tracing::debug!(user_id = %user.id, "Saving page for extension");
    save(&state, payload).await
}

/// `GET /api/pages`
pub async fn list_pages(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let limit = params.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT);
    let skip = params.skip.unwrap_or(0);
    match state.pages.list(limit, skip).await {
        Ok(pages) => Json(json!({ "success": true, "data": pages })).into_response(),
        Err(e) => storage_error(&e),
    }
}

/// `GET /api/pages/stats`
pub async fn page_stats(State(state): State<AppState>) -> Response {
    match state.pages.stats().await {
        Ok(stats) => Json(json!({ "success": true, "data": stats })).into_response(),
        Err(e) => storage_error(&e),
    }
}

/// `DELETE /api/pages/{id}`
pub async fn delete_page(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.pages.delete(&id).await {
        Ok(true) => Json(json!({
            "success": true,
            "message": "Page deleted successfully",
        }))
        .into_response(),
        Ok(false) => json_error(StatusCode::NOT_FOUND, "Page not found"),
        Err(e) => storage_error(&e),
    }
}

/// `POST /api/pages/bookmarks/token`
pub async fn sync_bookmarks(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<BookmarkSyncBody>,
) -> Response {
    let Some(bookmarks) = body.bookmarks else {
        return json_error(StatusCode::BAD_REQUEST, "Missing bookmarks");
    };
    let received = bookmarks.len();
    let summary = state.sync.sync(bookmarks).await;
    tracing::info!(
        user_id = %user.id,
        received,
        synced = summary.synced,
        skipped = summary.skipped,
        "Bookmarks synced"
    );
    Json(json!({
        "success": true,
        "synced": summary.synced,
        "skipped": summary.skipped,
    }))
    .into_response()
}

/// `GET /api/user`
pub async fn current_user(Extension(CurrentUser(user)): Extension<CurrentUser>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "user": {
            "id": user.id,
            "name": user.name,
            "email": user.email,
        }
    }))
}

/// `GET /login`
pub async fn login_page(Query(params): Query<LoginParams>) -> Html<String> {
    Html(templates::render_login_page(params.error.as_deref()))
}

/// `GET /dashboard`
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Response {
    let stats = match state.pages.stats().await {
        Ok(stats) => stats,
        Err(e) => return storage_error(&e),
    };
    let pages = match state.pages.list(DEFAULT_LIMIT, 0).await {
        Ok(pages) => pages,
        Err(e) => return storage_error(&e),
    };
    Html(templates::render_dashboard(&user, &stats, &pages)).into_response()
}
