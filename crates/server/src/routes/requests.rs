use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    member_role, AccessRequest, AccessRequestWithUser, AuthUser, RequestAccessBody, Room,
};
use crate::policy::{self, Action};
use crate::AppState;

/// POST /api/rooms/:slug/request-access
pub async fn request_access(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(room_slug): Path<String>,
    Json(body): Json<RequestAccessBody>,
) -> ApiResult<impl IntoResponse> {
    let room = Room::find_by_slug(&state.db, &room_slug)
        .await?
        .ok_or(ApiError::NotFound("Room"))?;

    if let Some(ref notes) = body.notes {
        roomy_shared::validation::validate_access_notes(notes)?;
    }

    if member_role(&state.db, &room.id, &user.id).await?.is_some() {
        return Err(ApiError::conflict("You are already a member of this room"));
    }

    let pending = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM access_requests WHERE room_id = ? AND user_id = ? AND status = 'pending'",
    )
    .bind(&room.id)
    .bind(&user.id)
    .fetch_one(&state.db)
    .await?;

    if pending > 0 {
        return Err(ApiError::conflict(
            "You already have a pending request for this room",
        ));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let inserted = sqlx::query(
        r#"INSERT INTO access_requests (id, room_id, user_id, status, notes, requested_at)
           VALUES (?, ?, ?, 'pending', ?, ?)"#,
    )
    .bind(&id)
    .bind(&room.id)
    .bind(&user.id)
    .bind(&body.notes)
    .bind(&now)
    .execute(&state.db)
    .await;

    // The partial unique index closes the race between the check above
    // and this insert.
    match inserted {
        Ok(_) => {}
        Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
            return Err(ApiError::conflict(
                "You already have a pending request for this room",
            ));
        }
        Err(e) => return Err(e.into()),
    }

    let request = AccessRequest {
        id,
        room_id: room.id,
        user_id: user.id,
        status: "pending".to_string(),
        notes: body.notes,
        requested_at: now,
        processed_at: None,
        processed_by: None,
    };

    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/rooms/:slug/access-requests
pub async fn list_access_requests(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(room_slug): Path<String>,
) -> ApiResult<Json<Vec<AccessRequestWithUser>>> {
    let room = Room::find_by_slug(&state.db, &room_slug)
        .await?
        .ok_or(ApiError::NotFound("Room"))?;

    let role = member_role(&state.db, &room.id, &user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this room"))?;

    if !policy::allows(role, Action::ProcessAccessRequest) {
        return Err(ApiError::forbidden(
            "Only admins and the creator can review access requests",
        ));
    }

    let requests = sqlx::query_as::<_, AccessRequestWithUser>(
        r#"SELECT a.id, a.room_id, a.user_id, a.status, a.notes, a.requested_at, u.username
           FROM access_requests a
           INNER JOIN users u ON u.id = a.user_id
           WHERE a.room_id = ? AND a.status = 'pending'
           ORDER BY a.requested_at ASC"#,
    )
    .bind(&room.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(requests))
}

/// Fetch a request and gate the caller as admin/creator of its room.
async fn load_for_processing(
    state: &AppState,
    user: &AuthUser,
    request_id: &str,
) -> ApiResult<AccessRequest> {
    let request = sqlx::query_as::<_, AccessRequest>("SELECT * FROM access_requests WHERE id = ?")
        .bind(request_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Access request"))?;

    let role = member_role(&state.db, &request.room_id, &user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this room"))?;

    if !policy::allows(role, Action::ProcessAccessRequest) {
        return Err(ApiError::forbidden(
            "Only admins and the creator can process access requests",
        ));
    }

    Ok(request)
}

/// POST /api/access-requests/:requestId/approve
///
/// Status flip and membership insert commit together; if the requester
/// became a member through another path in the meantime, the whole
/// transaction rolls back and the request stays pending.
pub async fn approve_request(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(request_id): Path<String>,
) -> ApiResult<StatusCode> {
    let request = load_for_processing(&state, &user, &request_id).await?;

    let now = chrono::Utc::now().to_rfc3339();
    let mut tx = state.db.begin().await?;

    let flipped = sqlx::query(
        r#"UPDATE access_requests
           SET status = 'approved', processed_at = ?, processed_by = ?
           WHERE id = ? AND status = 'pending'"#,
    )
    .bind(&now)
    .bind(&user.id)
    .bind(&request.id)
    .execute(&mut *tx)
    .await?;

    if flipped.rows_affected() == 0 {
        return Err(ApiError::conflict("Request has already been processed"));
    }

    let inserted = sqlx::query(
        "INSERT INTO room_members (room_id, user_id, role, joined_at) VALUES (?, ?, 'member', ?)",
    )
    .bind(&request.room_id)
    .bind(&request.user_id)
    .bind(&now)
    .execute(&mut *tx)
    .await;

    match inserted {
        Ok(_) => {}
        Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
            return Err(ApiError::conflict("User is already a member of this room"));
        }
        Err(e) => return Err(e.into()),
    }

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/access-requests/:requestId/reject
pub async fn reject_request(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(request_id): Path<String>,
) -> ApiResult<StatusCode> {
    let request = load_for_processing(&state, &user, &request_id).await?;

    let now = chrono::Utc::now().to_rfc3339();

    let flipped = sqlx::query(
        r#"UPDATE access_requests
           SET status = 'rejected', processed_at = ?, processed_by = ?
           WHERE id = ? AND status = 'pending'"#,
    )
    .bind(&now)
    .bind(&user.id)
    .bind(&request.id)
    .execute(&state.db)
    .await?;

    if flipped.rows_affected() == 0 {
        return Err(ApiError::conflict("Request has already been processed"));
    }

    Ok(StatusCode::NO_CONTENT)
}
