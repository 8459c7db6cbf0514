use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    member_role, AuthUser, CreateInviteRequest, Invite, InviteView, RedeemInviteRequest, Room,
};
use crate::policy::{self, Action};
use crate::AppState;

use roomy_shared::constants::INVITE_CODE_LENGTH;

/// A fresh alphanumeric code from the OS CSPRNG, retried until no
/// existing invite matches it (codes compare case-insensitively, so the
/// lookup goes through the NOCASE column).
async fn generate_unique_code(db: &sqlx::SqlitePool) -> Result<String, sqlx::Error> {
    loop {
        let code: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(INVITE_CODE_LENGTH)
            .map(char::from)
            .collect();

        let taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM room_invites WHERE code = ?")
            .bind(&code)
            .fetch_one(db)
            .await?;
        if taken == 0 {
            return Ok(code);
        }
    }
}

/// Resolve a room and require invite-management privileges.
async fn require_invite_admin(
    state: &AppState,
    user: &AuthUser,
    room_id: &str,
    action: Action,
) -> ApiResult<()> {
    let role = member_role(&state.db, room_id, &user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this room"))?;

    if !policy::allows(role, action) {
        return Err(ApiError::forbidden(
            "Only admins and the creator can manage invites",
        ));
    }
    Ok(())
}

/// POST /api/rooms/:slug/invites
pub async fn create_invite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(room_slug): Path<String>,
    Json(body): Json<CreateInviteRequest>,
) -> ApiResult<impl IntoResponse> {
    let room = Room::find_by_slug(&state.db, &room_slug)
        .await?
        .ok_or(ApiError::NotFound("Room"))?;

    require_invite_admin(&state, &user, &room.id, Action::CreateInvite).await?;

    roomy_shared::validation::validate_invite_params(body.ttl_hours, body.max_uses)?;

    let code = generate_unique_code(&state.db).await?;
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now();
    let expires_at = (now + chrono::Duration::hours(body.ttl_hours)).to_rfc3339();
    let created_at = now.to_rfc3339();

    sqlx::query(
        r#"INSERT INTO room_invites (id, room_id, code, created_by, expires_at, max_uses, used_count, is_active, created_at)
           VALUES (?, ?, ?, ?, ?, ?, 0, 1, ?)"#,
    )
    .bind(&id)
    .bind(&room.id)
    .bind(&code)
    .bind(&user.id)
    .bind(&expires_at)
    .bind(body.max_uses)
    .bind(&created_at)
    .execute(&state.db)
    .await?;

    let invite = Invite {
        id,
        room_id: room.id,
        code,
        created_by: user.id,
        expires_at,
        max_uses: body.max_uses,
        used_count: 0,
        is_active: 1,
        created_at,
    };

    Ok((StatusCode::CREATED, Json(invite)))
}

/// GET /api/rooms/:slug/invites
pub async fn list_invites(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(room_slug): Path<String>,
) -> ApiResult<Json<Vec<InviteView>>> {
    let room = Room::find_by_slug(&state.db, &room_slug)
        .await?
        .ok_or(ApiError::NotFound("Room"))?;

    require_invite_admin(&state, &user, &room.id, Action::CreateInvite).await?;

    let invites = sqlx::query_as::<_, Invite>(
        "SELECT * FROM room_invites WHERE room_id = ? ORDER BY created_at DESC",
    )
    .bind(&room.id)
    .fetch_all(&state.db)
    .await?;

    let now = chrono::Utc::now().to_rfc3339();
    let views = invites
        .into_iter()
        .map(|invite| InviteView {
            is_expired: invite.is_expired(&now),
            is_exhausted: invite.is_exhausted(),
            invite,
        })
        .collect();

    Ok(Json(views))
}

/// POST /api/invites/redeem
///
/// The used-count increment and the membership insert commit together.
/// The increment is a conditional update re-checking the usage limit, so
/// two racing redeemers can never both take the last slot.
pub async fn redeem_invite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<RedeemInviteRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let code = body.code.trim();
    if code.is_empty() {
        return Err(ApiError::InvalidInput("Invite code is required".into()));
    }

    let invite = sqlx::query_as::<_, Invite>("SELECT * FROM room_invites WHERE code = ?")
        .bind(code)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Invite"))?;

    let now = chrono::Utc::now().to_rfc3339();
    if invite.is_expired(&now) {
        return Err(ApiError::conflict("Invite has expired"));
    }
    if invite.is_exhausted() {
        return Err(ApiError::conflict("Invite has reached its usage limit"));
    }

    if member_role(&state.db, &invite.room_id, &user.id)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("You are already a member of this room"));
    }

    let mut tx = state.db.begin().await?;

    let claimed = sqlx::query(
        r#"UPDATE room_invites SET used_count = used_count + 1
           WHERE id = ? AND is_active = 1 AND expires_at > ?
             AND (max_uses IS NULL OR used_count < max_uses)"#,
    )
    .bind(&invite.id)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    if claimed.rows_affected() == 0 {
        // A concurrent redemption took the last use between our read and
        // this update; dropping the transaction rolls everything back.
        return Err(ApiError::conflict("Invite has reached its usage limit"));
    }

    let inserted = sqlx::query(
        "INSERT INTO room_members (room_id, user_id, role, joined_at) VALUES (?, ?, 'member', ?)",
    )
    .bind(&invite.room_id)
    .bind(&user.id)
    .bind(&now)
    .execute(&mut *tx)
    .await;

    match inserted {
        Ok(_) => {}
        Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
            return Err(ApiError::conflict("You are already a member of this room"));
        }
        Err(e) => return Err(e.into()),
    }

    tx.commit().await?;

    let (room_name, room_slug) =
        sqlx::query_as::<_, (String, String)>("SELECT name, slug FROM rooms WHERE id = ?")
            .bind(&invite.room_id)
            .fetch_one(&state.db)
            .await?;

    Ok(Json(serde_json::json!({
        "roomName": room_name,
        "roomSlug": room_slug,
    })))
}

/// POST /api/invites/:inviteId/revoke
///
/// Forces expiry to now; the row stays for the audit trail (contrast
/// with DELETE, which removes it).
pub async fn revoke_invite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(invite_id): Path<String>,
) -> ApiResult<StatusCode> {
    let invite = sqlx::query_as::<_, Invite>("SELECT * FROM room_invites WHERE id = ?")
        .bind(&invite_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Invite"))?;

    require_invite_admin(&state, &user, &invite.room_id, Action::DeleteInvite).await?;

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query("UPDATE room_invites SET expires_at = ? WHERE id = ?")
        .bind(&now)
        .bind(&invite.id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/invites/:inviteId
pub async fn delete_invite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(invite_id): Path<String>,
) -> ApiResult<StatusCode> {
    let invite = sqlx::query_as::<_, Invite>("SELECT * FROM room_invites WHERE id = ?")
        .bind(&invite_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Invite"))?;

    require_invite_admin(&state, &user, &invite.room_id, Action::DeleteInvite).await?;

    sqlx::query("DELETE FROM room_invites WHERE id = ?")
        .bind(&invite.id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
