use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    member_role, AuthUser, CreateRoomRequest, PublicRoomEntry, Room, RoomWithRole,
};
use crate::policy::{self, Action};
use crate::slug;
use crate::AppState;

/// POST /api/rooms
///
/// Room and creator membership are inserted in one transaction: a room
/// never exists without exactly one `creator` member.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateRoomRequest>,
) -> ApiResult<impl IntoResponse> {
    roomy_shared::validation::validate_room_name(&body.name)?;
    if let Some(ref description) = body.description {
        roomy_shared::validation::validate_room_description(description)?;
    }

    let room_slug = slug::unique_slug(&state.db, &body.name).await?;
    let room_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let name = body.name.trim().to_string();

    let mut tx = state.db.begin().await?;

    sqlx::query(
        r#"INSERT INTO rooms (id, name, slug, description, is_private, allow_images, allow_videos, creator_id, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&room_id)
    .bind(&name)
    .bind(&room_slug)
    .bind(&body.description)
    .bind(body.is_private as i64)
    .bind(body.allow_images as i64)
    .bind(body.allow_videos as i64)
    .bind(&user.id)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO room_members (room_id, user_id, role, joined_at) VALUES (?, ?, 'creator', ?)",
    )
    .bind(&room_id)
    .bind(&user.id)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let room = Room {
        id: room_id,
        name,
        slug: room_slug,
        description: body.description,
        is_private: body.is_private as i64,
        allow_images: body.allow_images as i64,
        allow_videos: body.allow_videos as i64,
        creator_id: user.id,
        created_at: now,
    };

    Ok((StatusCode::CREATED, Json(room)))
}

/// GET /api/rooms
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<RoomWithRole>>> {
    let rooms = sqlx::query_as::<_, RoomWithRole>(
        r#"SELECT r.id, r.name, r.slug, r.description, r.is_private, r.creator_id, r.created_at, m.role
           FROM room_members m
           INNER JOIN rooms r ON r.id = m.room_id
           WHERE m.user_id = ?
           ORDER BY r.created_at ASC"#,
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rooms))
}

/// GET /api/rooms/public
pub async fn list_public_rooms(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<PublicRoomEntry>>> {
    let rooms = sqlx::query_as::<_, PublicRoomEntry>(
        r#"SELECT r.id, r.name, r.slug, r.description,
                  (SELECT COUNT(*) FROM room_members m WHERE m.room_id = r.id) AS member_count,
                  EXISTS(SELECT 1 FROM room_members m WHERE m.room_id = r.id AND m.user_id = ?) AS is_member,
                  EXISTS(SELECT 1 FROM access_requests a
                         WHERE a.room_id = r.id AND a.user_id = ? AND a.status = 'pending') AS has_pending_request
           FROM rooms r
           WHERE r.is_private = 0
           ORDER BY r.created_at ASC"#,
    )
    .bind(&user.id)
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rooms))
}

/// GET /api/rooms/:slug
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(room_slug): Path<String>,
) -> ApiResult<Json<RoomWithRole>> {
    let room = Room::find_by_slug(&state.db, &room_slug)
        .await?
        .ok_or(ApiError::NotFound("Room"))?;

    let role = member_role(&state.db, &room.id, &user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this room"))?;

    Ok(Json(RoomWithRole {
        id: room.id,
        name: room.name,
        slug: room.slug,
        description: room.description,
        is_private: room.is_private,
        creator_id: room.creator_id,
        created_at: room.created_at,
        role: role.as_str().to_string(),
    }))
}

/// DELETE /api/rooms/:slug
///
/// Hard delete; memberships, invites, access requests and messages go
/// with it via ON DELETE CASCADE.
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(room_slug): Path<String>,
) -> ApiResult<StatusCode> {
    let room = Room::find_by_slug(&state.db, &room_slug)
        .await?
        .ok_or(ApiError::NotFound("Room"))?;

    let role = member_role(&state.db, &room.id, &user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this room"))?;

    if !policy::allows(role, Action::DeleteRoom) {
        return Err(ApiError::forbidden("Only the room creator can delete it"));
    }

    sqlx::query("DELETE FROM rooms WHERE id = ?")
        .bind(&room.id)
        .execute(&state.db)
        .await?;

    state.broadcaster.drop_room(&room.slug).await;

    Ok(StatusCode::NO_CONTENT)
}
