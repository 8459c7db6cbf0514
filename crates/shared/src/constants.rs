pub const APP_NAME: &str = "Roomy";

// Limits
pub const MAX_MESSAGE_LENGTH: usize = 1000;
pub const MAX_ROOM_NAME_LENGTH: usize = 100;
pub const MAX_ROOM_DESCRIPTION_LENGTH: usize = 500;
pub const MAX_ACCESS_NOTES_LENGTH: usize = 500;

pub const MESSAGE_PAGE_SIZE: i64 = 50;
pub const MESSAGE_PAGE_MAX: i64 = 100;

// Invites
pub const INVITE_CODE_LENGTH: usize = 12;
pub const MIN_INVITE_TTL_HOURS: i64 = 1;
pub const MAX_INVITE_TTL_HOURS: i64 = 168;
pub const MIN_INVITE_USES: i64 = 1;
pub const MAX_INVITE_USES: i64 = 100;
