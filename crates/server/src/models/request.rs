use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub status: String,
    pub notes: Option<String>,
    pub requested_at: String,
    pub processed_at: Option<String>,
    pub processed_by: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequestWithUser {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub status: String,
    pub notes: Option<String>,
    pub requested_at: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestAccessBody {
    pub notes: Option<String>,
}
