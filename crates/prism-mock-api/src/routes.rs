//! HTTP surface of the mock API.
//!
//! Shapes follow the platform: login and plain listings answer bare JSON,
//! notices and refresh answer `{ success, data }` envelopes, and the file
//! endpoint answers plain text.

use std::sync::Arc;

use axum::extract::{Path, Query, Request, State};
use axum::http::HeaderMap;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use prism_models::{
    AdminProfile, ApiPaths, CategoryChannel, ChannelStatus, Feed, Notice, Page, UserSummary,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::MockApiError;
use crate::state::MockState;

/// Prefix every route is mounted under.
pub const API_PREFIX: &str = "/api/v1";

const CDN_BASE: &str = "https://cdn.prism.dev/files";

type AppState = State<Arc<MockState>>;

/// Build the router over shared state.
pub fn router(state: Arc<MockState>) -> Router {
    let api = Router::new()
        .route(ApiPaths::LOGIN, post(login))
        .route(ApiPaths::REFRESH, post(refresh))
        .route(ApiPaths::USERS, get(list_users))
        .route(ApiPaths::FEEDS, get(list_feeds))
        .route(ApiPaths::NOTICES, get(list_notices))
        .route(ApiPaths::CATEGORY_CHANNELS, get(list_channels))
        .route(ApiPaths::CHANNEL_STATUS_ROUTE, post(set_channel_status))
        .route(ApiPaths::FILE_URL, get(file_url));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

async fn record_request(State(state): AppState, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    let path = path.strip_prefix(API_PREFIX).unwrap_or(path).to_string();
    state.record(&path, bearer(request.headers()));
    if let Some(delay) = state.path_delay(&path) {
        tokio::time::sleep(delay).await;
    }
    next.run(request).await
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// `POST /auth/login`: bare profile carrying the token pair.
async fn login(
    State(state): AppState,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AdminProfile>, MockApiError> {
    let profile = state.login(&req.email, &req.password)?;
    info!(email = %req.email, "admin logged in");
    Ok(Json(profile))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

/// `POST /auth/refresh`: enveloped rotated pair.
async fn refresh(
    State(state): AppState,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<Value>, MockApiError> {
    let delay = state.config().refresh_delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let pair = state.rotate(&req.refresh_token)?;
    info!(calls = state.refresh_calls(), "token pair rotated");
    Ok(Json(json!({
        "success": true,
        "data": {
            "accessToken": pair.access_token,
            "refreshToken": pair.refresh_token,
        }
    })))
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PageParams {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    size: Option<u32>,
}

#[derive(Deserialize)]
struct NoticeParams {
    #[serde(default)]
    search: String,
    #[serde(default)]
    page: u32,
    #[serde(default)]
    size: Option<u32>,
}

fn paginate<T: Clone>(items: &[T], page: u32, size: u32) -> Page<T> {
    let size = size.max(1);
    let total = items.len();
    let start = (page as usize).saturating_mul(size as usize).min(total);
    let end = start.saturating_add(size as usize).min(total);
    Page {
        content: items[start..end].to_vec(),
        total_pages: u32::try_from(total.div_ceil(size as usize)).unwrap_or(u32::MAX),
        total_elements: total as u64,
        number: page,
        size,
    }
}

/// `GET /users`: bare page, default size 20.
async fn list_users(
    State(state): AppState,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<UserSummary>>, MockApiError> {
    state.authorize(bearer(&headers))?;
    let size = params.size.unwrap_or(20);
    Ok(Json(state.with_catalog(|c| paginate(&c.users, params.page, size))))
}

/// `GET /feeds/home`: bare page, default size 10.
async fn list_feeds(
    State(state): AppState,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Feed>>, MockApiError> {
    state.authorize(bearer(&headers))?;
    let size = params.size.unwrap_or(10);
    Ok(Json(state.with_catalog(|c| paginate(&c.feeds, params.page, size))))
}

/// `GET /notices`: enveloped page, newest first, filtered by `search`.
async fn list_notices(
    State(state): AppState,
    headers: HeaderMap,
    Query(params): Query<NoticeParams>,
) -> Result<Json<Value>, MockApiError> {
    state.authorize(bearer(&headers))?;
    let needle = params.search.to_lowercase();
    let page = state.with_catalog(|c| {
        let mut matching: Vec<Notice> = c
            .notices
            .iter()
            .filter(|n| {
                needle.is_empty()
                    || n.title.to_lowercase().contains(&needle)
                    || n.content.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        paginate(&matching, params.page, params.size.unwrap_or(10))
    });
    Ok(Json(json!({ "success": true, "data": page })))
}

/// `GET /category-channels/all`: bare page, default size 10.
async fn list_channels(
    State(state): AppState,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<CategoryChannel>>, MockApiError> {
    state.authorize(bearer(&headers))?;
    let size = params.size.unwrap_or(10);
    Ok(Json(state.with_catalog(|c| paginate(&c.channels, params.page, size))))
}

// ---------------------------------------------------------------------------
// Moderation and files
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct StatusParams {
    status: String,
}

/// `POST /admin/category-channels/{id}/status?status=…`
async fn set_channel_status(
    State(state): AppState,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Query(params): Query<StatusParams>,
) -> Result<Json<Value>, MockApiError> {
    state.authorize(bearer(&headers))?;
    let status: ChannelStatus = params
        .status
        .parse()
        .map_err(|_| MockApiError::BadRequest(format!("unknown status {}", params.status)))?;
    state.set_channel_status(id, status)?;
    info!(channel_id = id, %status, "channel moderated");
    Ok(Json(json!({
        "success": true,
        "message": format!("channel {id} is now {status}"),
    })))
}

#[derive(Deserialize)]
struct FileParams {
    #[serde(default)]
    filename: String,
}

/// `GET /files/url?filename=…`: plain-text URL.
async fn file_url(
    State(state): AppState,
    headers: HeaderMap,
    Query(params): Query<FileParams>,
) -> Result<String, MockApiError> {
    state.authorize(bearer(&headers))?;
    if params.filename.is_empty() {
        return Err(MockApiError::BadRequest("filename is required".into()));
    }
    Ok(format!("{CDN_BASE}/{}", params.filename))
}
