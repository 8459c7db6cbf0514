use serde::{Deserialize, Serialize};

use crate::policy::Role;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_private: i64,
    pub allow_images: i64,
    pub allow_videos: i64,
    pub creator_id: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoomWithRole {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_private: i64,
    pub creator_id: String,
    pub created_at: String,
    pub role: String,
}

/// Public-directory entry: joinable rooms plus where the caller stands.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicRoomEntry {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub member_count: i64,
    pub is_member: i64,
    pub has_pending_request: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default = "default_true")]
    pub allow_images: bool,
    #[serde(default = "default_true")]
    pub allow_videos: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemberWithUser {
    pub room_id: String,
    pub user_id: String,
    pub role: String,
    pub joined_at: String,
    pub username: String,
}

impl Room {
    pub async fn find_by_slug(
        db: &sqlx::SqlitePool,
        slug: &str,
    ) -> Result<Option<Room>, sqlx::Error> {
        sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE slug = ?")
            .bind(slug)
            .fetch_optional(db)
            .await
    }
}

/// The caller's role in a room, straight from the membership table. Every
/// authorization read goes through here so it always observes the latest
/// committed write.
pub async fn member_role(
    db: &sqlx::SqlitePool,
    room_id: &str,
    user_id: &str,
) -> Result<Option<Role>, sqlx::Error> {
    let role = sqlx::query_scalar::<_, String>(
        "SELECT role FROM room_members WHERE room_id = ? AND user_id = ?",
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(role.as_deref().and_then(Role::parse))
}
