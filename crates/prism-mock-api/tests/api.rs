use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use prism_mock_api::{MockConfig, MockState, router};
use prism_models::{AdminProfile, ApiResult, CategoryChannel, Credential, Notice, Page, UserSummary};
use serde_json::json;

fn server() -> (TestServer, Arc<MockState>) {
    let state = Arc::new(MockState::new(MockConfig::default()));
    let server = TestServer::new(router(Arc::clone(&state))).unwrap();
    (server, state)
}

#[tokio::test]
async fn login_returns_profile_with_tokens() {
    let (server, _) = server();
    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "admin@prism.dev", "password": "prism-admin" }))
        .await;
    response.assert_status_ok();
    let profile: AdminProfile = response.json();
    assert!(profile.credential().unwrap().can_refresh());
    assert_eq!(profile.authority.as_deref(), Some("ROLE_ADMIN"));
}

#[tokio::test]
async fn bad_login_is_unauthorized_with_message() {
    let (server, _) = server();
    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "admin@prism.dev", "password": "nope" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "invalid email or password");
}

#[tokio::test]
async fn listings_require_a_live_token() {
    let (server, state) = server();
    server
        .get("/api/v1/users")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let expired = state.issue_tokens(Duration::ZERO);
    server
        .get("/api/v1/users")
        .authorization_bearer(&expired.access_token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let live = state.issue_tokens(Duration::from_secs(60));
    let page: Page<UserSummary> = server
        .get("/api/v1/users")
        .authorization_bearer(&live.access_token)
        .await
        .json();
    assert_eq!(page.content.len(), 20);
    assert_eq!(page.total_elements, 45);
    assert_eq!(page.total_pages, 3);
}

#[tokio::test]
async fn refresh_rotates_and_consumes_the_refresh_token() {
    let (server, state) = server();
    let pair = state.issue_tokens(Duration::ZERO);

    let response = server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refreshToken": pair.refresh_token }))
        .await;
    response.assert_status_ok();
    let next = Credential::from_refresh_payload(response.as_bytes()).unwrap();
    assert_ne!(next.access_token, pair.access_token);

    server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refreshToken": pair.refresh_token }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(state.refresh_calls(), 2);
}

#[tokio::test]
async fn notices_are_enveloped_and_searchable() {
    let (server, state) = server();
    let live = state.issue_tokens(Duration::from_secs(60));
    let response = server
        .get("/api/v1/notices")
        .add_query_param("search", "maintenance")
        .add_query_param("page", 0)
        .add_query_param("size", 10)
        .authorization_bearer(&live.access_token)
        .await;
    response.assert_status_ok();

    let page = ApiResult::<Page<Notice>>::from_slice(response.as_bytes())
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(page.total_elements, 3);
    assert!(page
        .content
        .windows(2)
        .all(|w| w[0].created_at >= w[1].created_at));
}

#[tokio::test]
async fn channel_moderation_updates_listing() {
    let (server, state) = server();
    let live = state.issue_tokens(Duration::from_secs(60));

    let response = server
        .post("/api/v1/admin/category-channels/1/status")
        .add_query_param("status", "APPROVED")
        .authorization_bearer(&live.access_token)
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "channel 1 is now APPROVED");

    let page: Page<CategoryChannel> = server
        .get("/api/v1/category-channels/all")
        .authorization_bearer(&live.access_token)
        .await
        .json();
    assert_eq!(
        page.content[0].category_channel_status,
        prism_models::ChannelStatus::Approved
    );

    server
        .post("/api/v1/admin/category-channels/404/status")
        .add_query_param("status", "REJECTED")
        .authorization_bearer(&live.access_token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn file_url_is_plain_text() {
    let (server, state) = server();
    let live = state.issue_tokens(Duration::from_secs(60));
    let response = server
        .get("/api/v1/files/url")
        .add_query_param("filename", "avatar.png")
        .authorization_bearer(&live.access_token)
        .await;
    response.assert_status_ok();
    assert_eq!(response.text(), "https://cdn.prism.dev/files/avatar.png");
}

#[tokio::test]
async fn requests_are_recorded_with_their_bearer() {
    let (server, state) = server();
    let live = state.issue_tokens(Duration::from_secs(60));
    server
        .get("/api/v1/feeds/home")
        .authorization_bearer(&live.access_token)
        .await
        .assert_status_ok();

    let log = state.recorded_requests();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].path, "/feeds/home");
    assert_eq!(log[0].bearer.as_deref(), Some(live.access_token.as_str()));
}

#[tokio::test]
async fn forced_outage_answers_503_with_message() {
    let (server, state) = server();
    let live = state.issue_tokens(Duration::from_secs(60));
    state.set_force_unavailable(true);

    let response = server
        .get("/api/v1/users")
        .authorization_bearer(&live.access_token)
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "service under maintenance");
}
