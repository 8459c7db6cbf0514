use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::AuthUser;
use crate::AppState;

const SESSION_COOKIE: &str = "session_token=";

/// Pull a session token out of the Authorization header or the session
/// cookie. The WebSocket upgrade additionally accepts a `token` query
/// parameter (browsers cannot set headers on upgrade requests).
pub fn token_from_parts(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.to_string());

    let cookie = parts
        .headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .split(';')
        .filter_map(|c| {
            let c = c.trim();
            c.strip_prefix(SESSION_COOKIE).map(|t| t.to_string())
        })
        .next();

    bearer.or(cookie).filter(|t| !t.is_empty())
}

/// Resolve a token to its user, enforcing session expiry.
pub async fn lookup_session(state: &AppState, token: &str) -> Option<AuthUser> {
    let row = sqlx::query_as::<_, (String, String, String)>(
        r#"SELECT u.id, u.username, s.expires_at
           FROM sessions s
           JOIN users u ON u.id = s.user_id
           WHERE s.token = ?"#,
    )
    .bind(token)
    .fetch_optional(&state.db)
    .await
    .ok()??;

    let now = chrono::Utc::now().to_rfc3339();
    if row.2 < now {
        return None;
    }

    Some(AuthUser {
        id: row.0,
        username: row.1,
    })
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)
            .ok_or_else(|| ApiError::Unauthorized.into_response())?;

        lookup_session(state, &token)
            .await
            .ok_or_else(|| ApiError::Unauthorized.into_response())
    }
}
