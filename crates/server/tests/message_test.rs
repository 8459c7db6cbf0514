mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;

use common::auth_header;

async fn setup() -> (TestServer, sqlx::SqlitePool) {
    let pool = common::setup_test_db().await;
    let app = common::create_test_app(pool.clone());
    let server = TestServer::new(app).unwrap();
    (server, pool)
}

// ── Creation ──

#[tokio::test]
async fn send_and_list_round_trips_content() {
    let (server, pool) = setup().await;
    let (alice_id, token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    common::create_test_room(&pool, &alice_id, "General", "general").await;

    let content = "hello with ünïcode 🎉";
    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/rooms/general/messages")
        .add_header(h, v)
        .json(&json!({ "content": content }))
        .await;
    res.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = res.json();
    assert_eq!(created["content"], content);
    assert_eq!(created["createdAt"], created["updatedAt"]);

    // The stored at-rest copy is encoded, not the raw text
    let encoded = sqlx::query_scalar::<_, String>("SELECT encoded_content FROM messages")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_ne!(encoded, content);

    let (h, v) = auth_header(&token);
    let res = server.get("/api/rooms/general/messages").add_header(h, v).await;
    res.assert_status_ok();
    let body: serde_json::Value = res.json();
    assert_eq!(body["items"][0]["content"], content);
    assert_eq!(body["items"][0]["username"], "alice");
}

#[tokio::test]
async fn send_requires_membership() {
    let (server, pool) = setup().await;
    let (alice_id, _) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let (_, bob_token) = common::create_test_user(&pool, "bob@test.com", "bob").await;
    common::create_test_room(&pool, &alice_id, "General", "general").await;

    let (h, v) = auth_header(&bob_token);
    let res = server
        .post("/api/rooms/general/messages")
        .add_header(h, v)
        .json(&json!({ "content": "intruder" }))
        .await;

    res.assert_status(StatusCode::FORBIDDEN);

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn empty_message_without_attachment_is_rejected() {
    let (server, pool) = setup().await;
    let (alice_id, token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    common::create_test_room(&pool, &alice_id, "General", "general").await;

    for body in [json!({}), json!({ "content": "   " })] {
        let (h, v) = auth_header(&token);
        let res = server
            .post("/api/rooms/general/messages")
            .add_header(h, v)
            .json(&body)
            .await;
        res.assert_status(StatusCode::BAD_REQUEST);
    }

    // Attachment alone is fine
    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/rooms/general/messages")
        .add_header(h, v)
        .json(&json!({ "attachmentRef": "uploads/cat.png" }))
        .await;
    res.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = res.json();
    assert_eq!(body["attachmentRef"], "uploads/cat.png");
}

#[tokio::test]
async fn oversized_message_is_rejected_not_truncated() {
    let (server, pool) = setup().await;
    let (alice_id, token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    common::create_test_room(&pool, &alice_id, "General", "general").await;

    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/rooms/general/messages")
        .add_header(h, v)
        .json(&json!({ "content": "x".repeat(1001) }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    // Exactly at the limit is fine
    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/rooms/general/messages")
        .add_header(h, v)
        .json(&json!({ "content": "x".repeat(1000) }))
        .await;
    res.assert_status(StatusCode::CREATED);
}

// ── Listing ──

#[tokio::test]
async fn pagination_is_offset_based_and_chronological_within_a_page() {
    let (server, pool) = setup().await;
    let (alice_id, token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    common::create_test_room(&pool, &alice_id, "General", "general").await;

    for i in 1..=5 {
        let (h, v) = auth_header(&token);
        server
            .post("/api/rooms/general/messages")
            .add_header(h, v)
            .json(&json!({ "content": format!("msg {}", i) }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    // First page: newest two, oldest-first within the page
    let (h, v) = auth_header(&token);
    let res = server
        .get("/api/rooms/general/messages?limit=2&offset=0")
        .add_header(h, v)
        .await;
    let body: serde_json::Value = res.json();
    assert_eq!(body["items"][0]["content"], "msg 4");
    assert_eq!(body["items"][1]["content"], "msg 5");
    assert_eq!(body["hasMore"], true);

    // Last page
    let (h, v) = auth_header(&token);
    let res = server
        .get("/api/rooms/general/messages?limit=2&offset=4")
        .add_header(h, v)
        .await;
    let body: serde_json::Value = res.json();
    assert_eq!(body["items"][0]["content"], "msg 1");
    assert_eq!(body["hasMore"], false);
}

#[tokio::test]
async fn list_requires_membership() {
    let (server, pool) = setup().await;
    let (alice_id, _) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let (_, bob_token) = common::create_test_user(&pool, "bob@test.com", "bob").await;
    common::create_test_room(&pool, &alice_id, "General", "general").await;

    let (h, v) = auth_header(&bob_token);
    let res = server.get("/api/rooms/general/messages").add_header(h, v).await;
    res.assert_status(StatusCode::FORBIDDEN);
}

// ── Edit ──

#[tokio::test]
async fn author_edits_own_message() {
    let (server, pool) = setup().await;
    let (alice_id, token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    common::create_test_room(&pool, &alice_id, "General", "general").await;

    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/rooms/general/messages")
        .add_header(h, v)
        .json(&json!({ "content": "draft" }))
        .await;
    let message_id = res.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (h, v) = auth_header(&token);
    let res = server
        .patch(&format!("/api/messages/{}", message_id))
        .add_header(h, v)
        .json(&json!({ "content": "final" }))
        .await;
    res.assert_status(StatusCode::NO_CONTENT);

    let (h, v) = auth_header(&token);
    let res = server.get("/api/rooms/general/messages").add_header(h, v).await;
    let body: serde_json::Value = res.json();
    assert_eq!(body["items"][0]["content"], "final");
}

#[tokio::test]
async fn only_the_author_can_edit() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob@test.com", "bob").await;
    let room_id = common::create_test_room(&pool, &alice_id, "General", "general").await;
    // Even a room admin cannot edit someone else's message
    common::add_member(&pool, &room_id, &bob_id, "admin").await;

    let (h, v) = auth_header(&alice_token);
    let res = server
        .post("/api/rooms/general/messages")
        .add_header(h, v)
        .json(&json!({ "content": "alice's words" }))
        .await;
    let message_id = res.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (h, v) = auth_header(&bob_token);
    let res = server
        .patch(&format!("/api/messages/{}", message_id))
        .add_header(h, v)
        .json(&json!({ "content": "bob's words" }))
        .await;
    res.assert_status(StatusCode::FORBIDDEN);

    let content = sqlx::query_scalar::<_, String>("SELECT content FROM messages WHERE id = ?")
        .bind(&message_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(content, "alice's words");
}

// ── Delete ──

#[tokio::test]
async fn author_deletes_own_message() {
    let (server, pool) = setup().await;
    let (alice_id, token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    common::create_test_room(&pool, &alice_id, "General", "general").await;

    let (h, v) = auth_header(&token);
    let res = server
        .post("/api/rooms/general/messages")
        .add_header(h, v)
        .json(&json!({ "content": "oops" }))
        .await;
    let message_id = res.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (h, v) = auth_header(&token);
    let res = server
        .delete(&format!("/api/messages/{}", message_id))
        .add_header(h, v)
        .await;
    res.assert_status(StatusCode::NO_CONTENT);

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0, "hard delete, no tombstone");
}

#[tokio::test]
async fn room_admin_deletes_another_members_message() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob@test.com", "bob").await;
    let room_id = common::create_test_room(&pool, &alice_id, "General", "general").await;
    common::add_member(&pool, &room_id, &bob_id, "admin").await;

    let (h, v) = auth_header(&alice_token);
    let res = server
        .post("/api/rooms/general/messages")
        .add_header(h, v)
        .json(&json!({ "content": "to be moderated" }))
        .await;
    let message_id = res.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (h, v) = auth_header(&bob_token);
    let res = server
        .delete(&format!("/api/messages/{}", message_id))
        .add_header(h, v)
        .await;
    res.assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn plain_member_cannot_delete_others_messages() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob@test.com", "bob").await;
    let room_id = common::create_test_room(&pool, &alice_id, "General", "general").await;
    common::add_member(&pool, &room_id, &bob_id, "member").await;

    let (h, v) = auth_header(&alice_token);
    let res = server
        .post("/api/rooms/general/messages")
        .add_header(h, v)
        .json(&json!({ "content": "protected" }))
        .await;
    let message_id = res.json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (h, v) = auth_header(&bob_token);
    let res = server
        .delete(&format!("/api/messages/{}", message_id))
        .add_header(h, v)
        .await;
    res.assert_status(StatusCode::FORBIDDEN);

    // The message still exists afterward
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE id = ?")
        .bind(&message_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
