use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::models::{member_role, AuthUser, MemberWithUser, Room};
use crate::policy::{self, Action, Role};
use crate::AppState;

/// GET /api/rooms/:slug/members
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(room_slug): Path<String>,
) -> ApiResult<Json<Vec<MemberWithUser>>> {
    let room = Room::find_by_slug(&state.db, &room_slug)
        .await?
        .ok_or(ApiError::NotFound("Room"))?;

    member_role(&state.db, &room.id, &user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this room"))?;

    let members = sqlx::query_as::<_, MemberWithUser>(
        r#"SELECT m.room_id, m.user_id, m.role, m.joined_at, u.username
           FROM room_members m
           INNER JOIN users u ON u.id = m.user_id
           WHERE m.room_id = ?
           ORDER BY m.joined_at ASC"#,
    )
    .bind(&room.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(members))
}

/// Shared preamble for the role-mutation endpoints: resolve the room,
/// gate the caller, and forbid self-target and creator-target moves
/// before anything is written.
async fn load_role_change(
    state: &AppState,
    caller: &AuthUser,
    room_slug: &str,
    target_user_id: &str,
    action: Action,
    denied: &'static str,
) -> ApiResult<(Room, Role)> {
    let room = Room::find_by_slug(&state.db, room_slug)
        .await?
        .ok_or(ApiError::NotFound("Room"))?;

    let caller_role = member_role(&state.db, &room.id, &caller.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this room"))?;

    if !policy::allows(caller_role, action) {
        return Err(ApiError::forbidden(denied));
    }

    if target_user_id == caller.id {
        return Err(ApiError::forbidden("You cannot change your own membership"));
    }

    let target_role = member_role(&state.db, &room.id, target_user_id)
        .await?
        .ok_or(ApiError::NotFound("Member"))?;

    if target_role == Role::Creator {
        return Err(ApiError::forbidden(
            "The creator's membership cannot be changed",
        ));
    }

    Ok((room, target_role))
}

/// POST /api/rooms/:slug/members/:userId/promote
pub async fn promote_member(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((room_slug, target_user_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let (room, target_role) = load_role_change(
        &state,
        &user,
        &room_slug,
        &target_user_id,
        Action::PromoteMember,
        "Only the room creator can promote members",
    )
    .await?;

    if target_role == Role::Admin {
        return Err(ApiError::conflict("User is already an admin"));
    }

    sqlx::query("UPDATE room_members SET role = 'admin' WHERE room_id = ? AND user_id = ?")
        .bind(&room.id)
        .bind(&target_user_id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/rooms/:slug/members/:userId/demote
pub async fn demote_member(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((room_slug, target_user_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let (room, target_role) = load_role_change(
        &state,
        &user,
        &room_slug,
        &target_user_id,
        Action::DemoteAdmin,
        "Only the room creator can demote admins",
    )
    .await?;

    if target_role == Role::Member {
        return Err(ApiError::conflict("User is not an admin"));
    }

    sqlx::query("UPDATE room_members SET role = 'member' WHERE room_id = ? AND user_id = ?")
        .bind(&room.id)
        .bind(&target_user_id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/rooms/:slug/members/:userId
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((room_slug, target_user_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let (room, _target_role) = load_role_change(
        &state,
        &user,
        &room_slug,
        &target_user_id,
        Action::RemoveMember,
        "Only the room creator can remove members",
    )
    .await?;

    sqlx::query("DELETE FROM room_members WHERE room_id = ? AND user_id = ?")
        .bind(&room.id)
        .bind(&target_user_id)
        .execute(&state.db)
        .await?;

    // Removed members stop receiving the room's fan-out immediately
    state.broadcaster.kick_user(&room.slug, &target_user_id).await;

    Ok(StatusCode::NO_CONTENT)
}
