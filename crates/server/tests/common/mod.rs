#![allow(dead_code)]

pub mod ws_helpers;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use roomy_server::{codec, config::Config, routes, ws, AppState};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

/// Create an in-memory SQLite pool with schema applied.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();

    // Run schema
    let schema = include_str!("../../src/db/schema.sql");
    for statement in schema.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(&pool).await.unwrap();
        }
    }

    pool
}

/// Build a test Axum app with the given pool.
pub fn create_test_app(pool: SqlitePool) -> Router {
    let state = Arc::new(AppState {
        db: pool,
        config: Config {
            host: "127.0.0.1".into(),
            port: 0,
            database_path: ":memory:".into(),
            ws_send_buffer: 64,
        },
        broadcaster: Arc::new(ws::broadcaster::Broadcaster::new(64)),
        codec: Arc::new(codec::Base64Codec),
    });

    routes::build_router(state)
}

pub fn auth_header(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        format!("Bearer {}", token).parse().unwrap(),
    )
}

/// Create a test user with an active session. Returns (user_id, token).
pub async fn create_test_user(pool: &SqlitePool, email: &str, username: &str) -> (String, String) {
    let user_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO users (id, username, email, password_hash, is_admin, created_at)
           VALUES (?, ?, ?, 'not-a-real-hash', 0, ?)"#,
    )
    .bind(&user_id)
    .bind(username)
    .bind(email)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    let token = uuid::Uuid::new_v4().to_string();
    let session_id = uuid::Uuid::new_v4().to_string();
    let expires_at = (chrono::Utc::now() + chrono::Duration::days(30)).to_rfc3339();

    sqlx::query(
        r#"INSERT INTO sessions (id, user_id, token, expires_at, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(&session_id)
    .bind(&user_id)
    .bind(&token)
    .bind(&expires_at)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    (user_id, token)
}

/// Create a room with its creator membership, bypassing the API.
pub async fn create_test_room(
    pool: &SqlitePool,
    creator_id: &str,
    name: &str,
    slug: &str,
) -> String {
    let room_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO rooms (id, name, slug, description, is_private, allow_images, allow_videos, creator_id, created_at)
           VALUES (?, ?, ?, NULL, 0, 1, 1, ?, ?)"#,
    )
    .bind(&room_id)
    .bind(name)
    .bind(slug)
    .bind(creator_id)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO room_members (room_id, user_id, role, joined_at) VALUES (?, ?, 'creator', ?)",
    )
    .bind(&room_id)
    .bind(creator_id)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    room_id
}

/// Add a member to a room with the given role.
pub async fn add_member(pool: &SqlitePool, room_id: &str, user_id: &str, role: &str) {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO room_members (room_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)",
    )
    .bind(room_id)
    .bind(user_id)
    .bind(role)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();
}

/// Seed an invite row directly, for expiry/exhaustion cases.
pub async fn create_test_invite(
    pool: &SqlitePool,
    room_id: &str,
    created_by: &str,
    code: &str,
    expires_at: &str,
    max_uses: Option<i64>,
    used_count: i64,
) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO room_invites (id, room_id, code, created_by, expires_at, max_uses, used_count, is_active, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?)"#,
    )
    .bind(&id)
    .bind(room_id)
    .bind(code)
    .bind(created_by)
    .bind(expires_at)
    .bind(max_uses)
    .bind(used_count)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    id
}

pub async fn count_members(pool: &SqlitePool, room_id: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM room_members WHERE room_id = ?")
        .bind(room_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn member_role_of(pool: &SqlitePool, room_id: &str, user_id: &str) -> Option<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT role FROM room_members WHERE room_id = ? AND user_id = ?",
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .unwrap()
}
