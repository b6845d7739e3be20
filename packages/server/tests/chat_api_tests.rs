//! Integration tests for `POST /api/chat-enhanced`.
//!
//! Covers identity and ban checks, each answer branch (greeting, n8n
//! workflow, follow-up summary, local search, no results, out of scope) and
//! the side effects: query log, activity log and session persistence.

mod common;

use axum::{
    body::Body,
    http::{header, Method, StatusCode},
};
use common::{auth_for, request, TestHarness, TestUser};
use legalbot_core::common::MALFORMED_INPUT_MESSAGE;
use legalbot_core::domains::chat::responder::{
    GREETING_RESPONSE, NO_RESULTS_RESPONSE, OUT_OF_SCOPE_RESPONSE,
};
use legalbot_core::kernel::{
    BaseChatStore, InMemoryStore, MockChatWebhook, TestDependencies,
};
use serde_json::json;

const CHAT: &str = "/api/chat-enhanced";

fn harness_for(user: &TestUser, store: InMemoryStore) -> TestHarness {
    TestHarness::new(
        TestDependencies::new()
            .store(store)
            .mock_auth(auth_for(&[user])),
    )
}

// ============================================================================
// Identity and validation
// ============================================================================

#[tokio::test]
async fn anonymous_request_without_user_id_is_rejected() {
    let harness = TestHarness::new(TestDependencies::new());

    let response = harness
        .post_json(CHAT, json!({ "query": "Luật đất đai là gì?" }), None)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.body["error"].is_string());
    assert!(harness.deps.store.has_no_side_effects());
}

#[tokio::test]
async fn body_user_id_is_accepted_without_a_token() {
    let harness = TestHarness::new(TestDependencies::new());
    let user = TestUser::new("anon");

    let response = harness
        .post_json(
            CHAT,
            json!({ "query": "xin chào", "userId": user.id.to_string() }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["search_method"], "greeting");
    assert_eq!(harness.deps.store.query_logs()[0].user_id, user.id);
}

#[tokio::test]
async fn body_user_id_must_match_the_token() {
    let user = TestUser::new("alice");
    let harness = harness_for(&user, InMemoryStore::new());

    let response = harness
        .post_json(
            CHAT,
            json!({ "query": "xin chào", "userId": TestUser::new("mallory").id.to_string() }),
            user.token(),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(harness.deps.store.has_no_side_effects());
}

#[tokio::test]
async fn blank_query_is_a_bad_request() {
    let user = TestUser::new("alice");
    let harness = harness_for(&user, InMemoryStore::new());

    let response = harness
        .post_json(CHAT, json!({ "query": "   " }), user.token())
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(harness.deps.store.has_no_side_effects());
}

#[tokio::test]
async fn malformed_bodies_get_a_json_bad_request() {
    let user = TestUser::new("alice");
    let harness = harness_for(&user, InMemoryStore::new());

    let wrong_type = harness
        .post_json(CHAT, json!({ "query": 5 }), user.token())
        .await;

    let broken_json = request(Method::POST, CHAT, user.token())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let broken_json = harness.send(broken_json).await;

    let no_content_type = request(Method::POST, CHAT, user.token())
        .body(Body::from(r#"{"query":"luật đất đai"}"#))
        .unwrap();
    let no_content_type = harness.send(no_content_type).await;

    for response in [wrong_type, broken_json, no_content_type] {
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error"], MALFORMED_INPUT_MESSAGE);
    }
    assert!(harness.deps.store.has_no_side_effects());
}

#[tokio::test]
async fn banned_user_is_refused_and_flagged() {
    let user = TestUser::new("banned");
    let store = InMemoryStore::new();
    store.ban(user.id, None);
    let harness = harness_for(&user, store);

    let response = harness
        .post_json(CHAT, json!({ "query": "Thủ tục ly hôn" }), user.token())
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    let suspicious = harness.deps.store.suspicious();
    assert_eq!(suspicious.len(), 1);
    assert_eq!(suspicious[0].user_id, Some(user.id));
    assert!(harness.deps.store.query_logs().is_empty());
}

#[tokio::test]
async fn expired_ban_no_longer_applies() {
    let user = TestUser::new("reformed");
    let store = InMemoryStore::new();
    store.ban(user.id, Some(chrono::Utc::now() - chrono::Duration::days(1)));
    let harness = harness_for(&user, store);

    let response = harness
        .post_json(CHAT, json!({ "query": "chào bạn" }), user.token())
        .await;

    assert_eq!(response.status, StatusCode::OK);
}

// ============================================================================
// Answer branches
// ============================================================================

#[tokio::test]
async fn greeting_is_answered_without_search_or_webhook() {
    let user = TestUser::new("alice");
    let harness = TestHarness::new(
        TestDependencies::new()
            .mock_auth(auth_for(&[&user]))
            .mock_webhook(MockChatWebhook::new().with_answer("không dùng", vec![])),
    );

    let response = harness
        .post_json(CHAT, json!({ "query": "Xin chào!" }), user.token())
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["response"], GREETING_RESPONSE);
    assert_eq!(response.body["search_method"], "greeting");
    assert_eq!(response.body["total_sources"], 0);
    assert_eq!(harness.deps.webhook.as_ref().unwrap().call_count(), 0);
    assert!(harness.deps.store.search_calls().is_empty());

    let logs = harness.deps.store.query_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].search_method, "greeting");
}

#[tokio::test]
async fn webhook_answer_is_relayed_with_its_sources() {
    let user = TestUser::new("alice");
    let store = InMemoryStore::new();
    let law = store.seed_law("Luật Đất đai", Some("31/2024/QH15"), "Điều 1. Phạm vi");
    let harness = TestHarness::new(
        TestDependencies::new()
            .store(store)
            .mock_auth(auth_for(&[&user]))
            .mock_webhook(MockChatWebhook::new().with_answer(
                "Theo Luật Đất đai 2024, hồ sơ gồm...",
                vec![json!({ "id": law.id.to_string(), "title": law.title })],
            )),
    );

    let response = harness
        .post_json(
            CHAT,
            json!({
                "query": "Thủ tục cấp sổ đỏ theo luật 31/2024/QH15, cho tôi nguồn",
                "messages": [
                    { "role": "user", "content": "Tôi muốn hỏi về đất" },
                    { "role": "assistant", "content": "Bạn cần hỏi gì?" }
                ],
                "sessionId": "abc"
            }),
            user.token(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["search_method"], "n8n_webhook");
    assert_eq!(response.body["response"], "Theo Luật Đất đai 2024, hồ sơ gồm...");
    assert_eq!(response.body["total_sources"], 1);
    assert_eq!(response.body["matched_ids"], json!([law.id.to_string()]));
    assert!(harness.deps.store.search_calls().is_empty());

    let requests = harness.deps.webhook.as_ref().unwrap().requests();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent.user_id, user.id.to_string());
    assert_eq!(sent.session_id.as_deref(), Some("abc"));
    assert_eq!(sent.history.len(), 2);
    assert!(sent.context.is_legal_related);
    assert!(sent.context.wants_sources);
    assert_eq!(sent.context.document_numbers, vec!["31/2024/QH15".to_string()]);
}

#[tokio::test]
async fn webhook_failure_falls_back_to_local_search() {
    let user = TestUser::new("alice");
    let store = InMemoryStore::new();
    let law = store.seed_law(
        "Luật Đất đai",
        Some("31/2024/QH15"),
        "Luật này quy định về chế độ sở hữu đất đai và quyền sử dụng đất.",
    );
    store.seed_law("Luật Giao thông đường bộ", None, "Quy tắc giao thông.");
    let harness = TestHarness::new(
        TestDependencies::new()
            .store(store)
            .mock_auth(auth_for(&[&user]))
            .mock_webhook(MockChatWebhook::new().with_failure("timeout")),
    );

    let response = harness
        .post_json(CHAT, json!({ "query": "luật đất đai" }), user.token())
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["search_method"], "local_search");
    assert_eq!(harness.deps.webhook.as_ref().unwrap().call_count(), 1);

    let sources = response.body["sources"].as_array().unwrap();
    assert_eq!(sources[0]["id"], law.id.to_string());
    assert_eq!(sources[0]["url"], format!("/laws/{}", law.id));
    assert_eq!(response.body["matched_ids"][0], law.id.to_string());

    let text = response.body["response"].as_str().unwrap();
    assert!(text.contains("Luật Đất đai"));
    assert!(text.contains("31/2024/QH15"));
    assert!(!text.contains("Nguồn tham khảo"));

    assert_eq!(harness.deps.store.query_logs()[0].matched_ids[0], law.id);
}

#[tokio::test]
async fn source_request_appends_links() {
    let user = TestUser::new("alice");
    let store = InMemoryStore::new();
    let law = store.seed_law(
        "Luật Đất đai",
        None,
        "Luật này quy định về chế độ sở hữu đất đai.",
    );
    let harness = harness_for(&user, store);

    let response = harness
        .post_json(
            CHAT,
            json!({ "query": "luật đất đai, cho tôi nguồn tham khảo" }),
            user.token(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["search_method"], "local_search");
    let text = response.body["response"].as_str().unwrap();
    assert!(text.contains("**Nguồn tham khảo:**"));
    assert!(text.contains(&format!("(/laws/{})", law.id)));
}

#[tokio::test]
async fn legal_question_without_matches_gets_no_results() {
    let user = TestUser::new("alice");
    let harness = harness_for(&user, InMemoryStore::new());

    let response = harness
        .post_json(CHAT, json!({ "query": "Thủ tục ly hôn đơn phương" }), user.token())
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["search_method"], "no_results");
    assert_eq!(response.body["response"], NO_RESULTS_RESPONSE);
    assert!(!harness.deps.store.search_calls().is_empty());
}

#[tokio::test]
async fn unrelated_question_is_out_of_scope() {
    let user = TestUser::new("alice");
    let store = InMemoryStore::new();
    store.seed_law("Luật Đất đai", None, "Chế độ sở hữu đất đai.");
    let harness = harness_for(&user, store);

    let response = harness
        .post_json(CHAT, json!({ "query": "Thời tiết hôm nay thế nào?" }), user.token())
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["search_method"], "out_of_scope");
    assert_eq!(response.body["response"], OUT_OF_SCOPE_RESPONSE);
}

#[tokio::test]
async fn summary_request_condenses_the_previous_answer() {
    let user = TestUser::new("alice");
    let harness = harness_for(&user, InMemoryStore::new());

    let response = harness
        .post_json(
            CHAT,
            json!({
                "query": "Tóm tắt lại giúp tôi",
                "messages": [
                    { "role": "user", "content": "Thủ tục đăng ký kết hôn gồm những gì?" },
                    { "role": "assistant", "content": "Câu một. Câu hai. Câu ba. Câu bốn." }
                ]
            }),
            user.token(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["search_method"], "follow_up_summary");
    let text = response.body["response"].as_str().unwrap();
    assert!(text.starts_with("Tóm tắt nội dung đã trao đổi:"));
    assert!(text.contains("Câu một."));
    assert!(!text.contains("Câu bốn"));
    assert!(harness.deps.store.search_calls().is_empty());
}

// ============================================================================
// Side effects
// ============================================================================

#[tokio::test]
async fn turns_are_saved_to_an_owned_session() {
    let user = TestUser::new("alice");
    let store = InMemoryStore::new();
    let session = store.create_session(user.id, "Hỏi đáp").await.unwrap();
    let harness = harness_for(&user, store);

    let response = harness
        .post_json(
            CHAT,
            json!({ "query": "xin chào", "sessionId": session.id.to_string() }),
            user.token(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let messages = harness.deps.store.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, "user");
    assert_eq!(messages[0].content, "xin chào");
    assert_eq!(messages[1].role, "assistant");
    assert_eq!(messages[1].content, GREETING_RESPONSE);
    assert_eq!(
        messages[1].metadata.as_ref().unwrap()["search_method"],
        "greeting"
    );
}

#[tokio::test]
async fn turns_are_not_saved_to_someone_elses_session() {
    let user = TestUser::new("alice");
    let store = InMemoryStore::new();
    let other = store
        .create_session(TestUser::new("bob").id, "Của Bob")
        .await
        .unwrap();
    let harness = harness_for(&user, store);

    let response = harness
        .post_json(
            CHAT,
            json!({ "query": "xin chào", "sessionId": other.id.to_string() }),
            user.token(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(harness.deps.store.messages().is_empty());
}

#[tokio::test]
async fn failing_logs_do_not_fail_the_request() {
    let user = TestUser::new("alice");
    let harness = harness_for(&user, InMemoryStore::new().failing_logs());

    let response = harness
        .post_json(CHAT, json!({ "query": "chào bạn" }), user.token())
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["search_method"], "greeting");
}

#[tokio::test]
async fn chat_query_is_recorded_as_activity() {
    let user = TestUser::new("alice");
    let harness = harness_for(&user, InMemoryStore::new());

    harness
        .send(
            common::request(axum::http::Method::POST, CHAT, user.token())
                .header("content-type", "application/json")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .body(axum::body::Body::from(json!({ "query": "hello" }).to_string()))
                .unwrap(),
        )
        .await;

    let activities = harness.deps.store.activities();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].user_id, user.id);
    assert_eq!(activities[0].ip_address.as_deref(), Some("203.0.113.9"));
}
