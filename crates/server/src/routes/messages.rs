use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    member_role, AuthUser, EditMessageRequest, MessagePayload, MessageQuery, Room,
    SendMessageRequest,
};
use crate::policy::{self, Action};
use crate::ws::events::ServerEvent;
use crate::AppState;

use roomy_shared::constants::{MESSAGE_PAGE_MAX, MESSAGE_PAGE_SIZE};
use roomy_shared::validation;

/// Message creation pipeline, shared by the HTTP route and the WebSocket
/// handler: validate, authorize, encode, persist, then fan out. The
/// room's send lock is held across persist + broadcast so subscribers
/// observe messages in commit order.
pub async fn store_message(
    state: &AppState,
    room: &Room,
    user: &AuthUser,
    content: &str,
    attachment_ref: Option<String>,
) -> ApiResult<MessagePayload> {
    let attachment_ref = attachment_ref.filter(|a| !a.trim().is_empty());
    validation::validate_message_content(content, attachment_ref.is_some())?;

    let role = member_role(&state.db, &room.id, &user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this room"))?;

    if !policy::allows(role, Action::SendMessage) {
        return Err(ApiError::forbidden("Not allowed to send messages here"));
    }

    let lock = state.broadcaster.send_lock(&room.slug).await;
    let _guard = lock.lock().await;

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let encoded = state.codec.encode(content);

    sqlx::query(
        r#"INSERT INTO messages (id, room_id, user_id, content, encoded_content, attachment_ref, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(&room.id)
    .bind(&user.id)
    .bind(content)
    .bind(&encoded)
    .bind(&attachment_ref)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let payload = MessagePayload {
        id,
        room_id: room.id.clone(),
        user_id: user.id.clone(),
        username: user.username.clone(),
        content: content.to_string(),
        attachment_ref,
        created_at: now.clone(),
        updated_at: now,
    };

    // Fan-out is best-effort: the message is durable even if delivery to
    // some subscribers is lost.
    state
        .broadcaster
        .broadcast_room(
            &room.slug,
            &ServerEvent::Message {
                room: room.slug.clone(),
                message: payload.clone(),
            },
            None,
        )
        .await;

    Ok(payload)
}

/// POST /api/rooms/:slug/messages
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(room_slug): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let room = Room::find_by_slug(&state.db, &room_slug)
        .await?
        .ok_or(ApiError::NotFound("Room"))?;

    let content = body.content.unwrap_or_default();
    let payload = store_message(&state, &room, &user, &content, body.attachment_ref).await?;

    Ok((StatusCode::CREATED, Json(payload)))
}

#[derive(sqlx::FromRow)]
struct StoredMessage {
    id: String,
    room_id: String,
    user_id: String,
    content: String,
    encoded_content: String,
    attachment_ref: Option<String>,
    created_at: String,
    updated_at: String,
    username: String,
}

/// GET /api/rooms/:slug/messages?limit=&offset=
///
/// Offset pagination over reverse-chronological storage order; each page
/// is flipped to chronological before returning. Offsets are not stable
/// under concurrent inserts; callers wanting stability would need a
/// cursor on (created_at, id).
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(room_slug): Path<String>,
    Query(query): Query<MessageQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let limit = query
        .limit
        .unwrap_or(MESSAGE_PAGE_SIZE)
        .clamp(1, MESSAGE_PAGE_MAX);
    let offset = query.offset.unwrap_or(0).max(0);

    let room = Room::find_by_slug(&state.db, &room_slug)
        .await?
        .ok_or(ApiError::NotFound("Room"))?;

    member_role(&state.db, &room.id, &user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this room"))?;

    let mut rows = sqlx::query_as::<_, StoredMessage>(
        r#"SELECT m.id, m.room_id, m.user_id, m.content, m.encoded_content, m.attachment_ref,
                  m.created_at, m.updated_at, u.username
           FROM messages m
           INNER JOIN users u ON u.id = m.user_id
           WHERE m.room_id = ?
           ORDER BY m.created_at DESC, m.id DESC
           LIMIT ? OFFSET ?"#,
    )
    .bind(&room.id)
    .bind(limit + 1)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    let has_more = rows.len() as i64 > limit;
    if has_more {
        rows.pop();
    }
    rows.reverse(); // chronological order

    let items: Vec<MessagePayload> = rows
        .into_iter()
        .map(|row| {
            // The display copy backs up a codec that can't read its own
            // stored bytes (e.g. after a codec swap).
            let content = match state.codec.decode(&row.encoded_content) {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!("message {} failed to decode: {}", row.id, e);
                    row.content
                }
            };
            MessagePayload {
                id: row.id,
                room_id: row.room_id,
                user_id: row.user_id,
                username: row.username,
                content,
                attachment_ref: row.attachment_ref,
                created_at: row.created_at,
                updated_at: row.updated_at,
            }
        })
        .collect();

    Ok(Json(serde_json::json!({
        "items": items,
        "hasMore": has_more,
    })))
}

#[derive(sqlx::FromRow)]
struct MessageContext {
    author_id: String,
    room_id: String,
    room_slug: String,
}

async fn message_context(
    db: &sqlx::SqlitePool,
    message_id: &str,
) -> ApiResult<MessageContext> {
    sqlx::query_as::<_, MessageContext>(
        r#"SELECT m.user_id AS author_id, m.room_id, r.slug AS room_slug
           FROM messages m
           INNER JOIN rooms r ON r.id = m.room_id
           WHERE m.id = ?"#,
    )
    .bind(message_id)
    .fetch_optional(db)
    .await?
    .ok_or(ApiError::NotFound("Message"))
}

/// PATCH /api/messages/:messageId
pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(message_id): Path<String>,
    Json(body): Json<EditMessageRequest>,
) -> ApiResult<StatusCode> {
    let ctx = message_context(&state.db, &message_id).await?;

    // Editing is the author's alone; room admins may delete but not edit.
    if ctx.author_id != user.id {
        return Err(ApiError::forbidden("Only the author can edit a message"));
    }

    validation::validate_message_content(&body.content, false)?;

    let lock = state.broadcaster.send_lock(&ctx.room_slug).await;
    let _guard = lock.lock().await;

    let now = chrono::Utc::now().to_rfc3339();
    let encoded = state.codec.encode(&body.content);

    sqlx::query("UPDATE messages SET content = ?, encoded_content = ?, updated_at = ? WHERE id = ?")
        .bind(&body.content)
        .bind(&encoded)
        .bind(&now)
        .bind(&message_id)
        .execute(&state.db)
        .await?;

    state
        .broadcaster
        .broadcast_room(
            &ctx.room_slug,
            &ServerEvent::MessageEdit {
                room: ctx.room_slug.clone(),
                message_id,
                content: body.content,
                updated_at: now,
            },
            None,
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/messages/:messageId
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(message_id): Path<String>,
) -> ApiResult<StatusCode> {
    let ctx = message_context(&state.db, &message_id).await?;

    let allowed = if ctx.author_id == user.id {
        true
    } else {
        match member_role(&state.db, &ctx.room_id, &user.id).await? {
            Some(role) => policy::allows(role, Action::DeleteAnyMessage),
            None => false,
        }
    };

    if !allowed {
        return Err(ApiError::forbidden(
            "Only the author or a room admin can delete a message",
        ));
    }

    let lock = state.broadcaster.send_lock(&ctx.room_slug).await;
    let _guard = lock.lock().await;

    sqlx::query("DELETE FROM messages WHERE id = ?")
        .bind(&message_id)
        .execute(&state.db)
        .await?;

    state
        .broadcaster
        .broadcast_room(
            &ctx.room_slug,
            &ServerEvent::MessageDelete {
                room: ctx.room_slug.clone(),
                message_id,
            },
            None,
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
