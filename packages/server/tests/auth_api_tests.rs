//! Integration tests for the auth routes and the auth middleware.

mod common;

use axum::{
    body::Body,
    http::{header, Method, StatusCode},
};
use common::{auth_for, request, store_with_role, TestHarness, TestUser};
use legalbot_core::common::UserId;
use legalbot_core::domains::activity::ActivityType;
use legalbot_core::domains::auth::Role;
use legalbot_core::kernel::{InMemoryStore, MockAuthService, TestDependencies};
use serde_json::json;

const EMAIL: &str = "nguyenvana@example.vn";
const PASSWORD: &str = "matkhau123";

fn harness_with_account(user_id: UserId, store: InMemoryStore) -> TestHarness {
    TestHarness::new(
        TestDependencies::new()
            .store(store)
            .mock_auth(MockAuthService::new().with_account(EMAIL, PASSWORD, user_id)),
    )
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn login_returns_session_and_role() {
    let user_id = UserId::new();
    let store = InMemoryStore::new();
    store.add_profile(user_id, Role::Editor);
    let harness = harness_with_account(user_id, store);

    let response = harness
        .post_json(
            "/api/auth/login",
            json!({ "email": " NguyenVanA@example.vn ", "password": PASSWORD }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["id"], user_id.to_string());
    assert_eq!(response.body["user"]["role"], "editor");
    assert!(response.body["session"]["access_token"].is_string());
    assert!(response.body["session"]["refresh_token"].is_string());

    let activities = harness.deps.store.activities();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].activity_type, ActivityType::Login);
}

#[tokio::test]
async fn wrong_password_is_unauthorized_and_flagged() {
    let harness = harness_with_account(UserId::new(), InMemoryStore::new());

    let response = harness
        .post_json(
            "/api/auth/login",
            json!({ "email": EMAIL, "password": "sai-mat-khau" }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Email hoặc mật khẩu không đúng");

    let suspicious = harness.deps.store.suspicious();
    assert_eq!(suspicious.len(), 1);
    assert_eq!(suspicious[0].activity_type, "failed_login");
    assert!(harness.deps.store.activities().is_empty());
}

#[tokio::test]
async fn banned_account_cannot_log_in() {
    let user_id = UserId::new();
    let store = InMemoryStore::new();
    store.ban(user_id, None);
    let harness = harness_with_account(user_id, store);

    let response = harness
        .post_json(
            "/api/auth/login",
            json!({ "email": EMAIL, "password": PASSWORD }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(harness.deps.store.activities().is_empty());
}

#[tokio::test]
async fn login_requires_both_fields() {
    let harness = harness_with_account(UserId::new(), InMemoryStore::new());

    let response = harness
        .post_json("/api/auth/login", json!({ "email": EMAIL }), None)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Register and refresh
// ============================================================================

#[tokio::test]
async fn register_creates_account_that_can_log_in() {
    let harness = TestHarness::new(TestDependencies::new());

    let response = harness
        .post_json(
            "/api/auth/register",
            json!({ "email": "moi@example.vn", "password": "123456", "fullName": "Trần Thị B" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["email"], "moi@example.vn");
    assert_eq!(response.body["user"]["role"], "user");
    assert_eq!(response.body["requires_confirmation"], false);
    assert_eq!(
        harness.deps.store.activities()[0].activity_type,
        ActivityType::Register
    );

    let response = harness
        .post_json(
            "/api/auth/login",
            json!({ "email": "moi@example.vn", "password": "123456" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn register_validates_input() {
    let harness = harness_with_account(UserId::new(), InMemoryStore::new());

    let response = harness
        .post_json(
            "/api/auth/register",
            json!({ "email": "khong-hop-le", "password": "123456" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = harness
        .post_json(
            "/api/auth/register",
            json!({ "email": "ngan@example.vn", "password": "12345" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = harness
        .post_json(
            "/api/auth/register",
            json!({ "email": EMAIL, "password": "123456" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refresh_issues_new_session() {
    let user_id = UserId::new();
    let harness = harness_with_account(user_id, InMemoryStore::new());

    let login = harness
        .post_json(
            "/api/auth/login",
            json!({ "email": EMAIL, "password": PASSWORD }),
            None,
        )
        .await;
    let refresh_token = login.body["session"]["refresh_token"].as_str().unwrap();

    let response = harness
        .post_json(
            "/api/auth/refresh",
            json!({ "refreshToken": refresh_token }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["id"], user_id.to_string());

    let response = harness
        .post_json(
            "/api/auth/refresh",
            json!({ "refresh_token": "refresh-khong-ton-tai" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = harness
        .post_json("/api/auth/refresh", json!({}), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Current user and token sources
// ============================================================================

#[tokio::test]
async fn me_requires_authentication() {
    let harness = TestHarness::new(TestDependencies::new());

    let response = harness.get("/api/auth/me", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = harness.get("/api/auth/me", Some("token-gia")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_reports_profile_role() {
    let user = TestUser::new("admin");
    let harness = TestHarness::new(
        TestDependencies::new()
            .store(store_with_role(&user, Role::Admin))
            .mock_auth(auth_for(&[&user])),
    );

    let response = harness.get("/api/auth/me", user.token()).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], user.id.to_string());
    assert_eq!(response.body["role"], "admin");
    assert_eq!(response.body["can_manage_laws"], true);
}

#[tokio::test]
async fn access_token_is_read_from_cookies() {
    let user = TestUser::new("cookie");
    let harness = TestHarness::new(TestDependencies::new().mock_auth(auth_for(&[&user])));

    let legacy = request(Method::GET, "/api/auth/me", None)
        .header(header::COOKIE, format!("sb-access-token={}", user.token))
        .body(Body::empty())
        .unwrap();
    let response = harness.send(legacy).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["role"], "user");

    let cookie_value = urlencoding::encode(&format!("[\"{}\",\"refresh\"]", user.token)).into_owned();
    let supabase = request(Method::GET, "/api/auth/me", None)
        .header(header::COOKIE, format!("sb-project-auth-token={}", cookie_value))
        .body(Body::empty())
        .unwrap();
    let response = harness.send(supabase).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], user.id.to_string());
}

#[tokio::test]
async fn health_reports_unreachable_database() {
    let harness = TestHarness::new(TestDependencies::new());

    let response = harness.get("/health", None).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["status"], "unhealthy");
    assert_eq!(response.body["database"]["status"], "error");
    assert!(response.body["database"]["error"].is_string());
    assert_eq!(response.body["connection_pool"]["max_connections"], 10);
    assert_eq!(response.body["chat_webhook"], "disabled");
}
