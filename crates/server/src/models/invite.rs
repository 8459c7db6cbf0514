use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub id: String,
    pub room_id: String,
    pub code: String,
    pub created_by: String,
    pub expires_at: String,
    pub max_uses: Option<i64>,
    pub used_count: i64,
    pub is_active: i64,
    pub created_at: String,
}

impl Invite {
    pub fn is_expired(&self, now: &str) -> bool {
        self.is_active == 0 || self.expires_at.as_str() <= now
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_uses.is_some_and(|max| self.used_count >= max)
    }
}

/// Invite row plus derived state, for the management listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteView {
    #[serde(flatten)]
    pub invite: Invite,
    pub is_expired: bool,
    pub is_exhausted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteRequest {
    pub ttl_hours: i64,
    pub max_uses: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RedeemInviteRequest {
    pub code: String,
}
