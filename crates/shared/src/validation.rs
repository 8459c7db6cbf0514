use crate::constants::*;

pub fn validate_room_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Room name is required".into());
    }
    if trimmed.len() > MAX_ROOM_NAME_LENGTH {
        return Err(format!(
            "Room name must be at most {} characters",
            MAX_ROOM_NAME_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_room_description(description: &str) -> Result<(), String> {
    if description.len() > MAX_ROOM_DESCRIPTION_LENGTH {
        return Err(format!(
            "Description must be at most {} characters",
            MAX_ROOM_DESCRIPTION_LENGTH
        ));
    }
    Ok(())
}

/// A message needs text or an attachment reference; oversized text is
/// rejected outright, never truncated.
pub fn validate_message_content(content: &str, has_attachment: bool) -> Result<(), String> {
    if content.trim().is_empty() && !has_attachment {
        return Err("Message content or attachment is required".into());
    }
    if content.len() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_invite_params(ttl_hours: i64, max_uses: Option<i64>) -> Result<(), String> {
    if !(MIN_INVITE_TTL_HOURS..=MAX_INVITE_TTL_HOURS).contains(&ttl_hours) {
        return Err(format!(
            "Expiry must be between {} and {} hours",
            MIN_INVITE_TTL_HOURS, MAX_INVITE_TTL_HOURS
        ));
    }
    if let Some(uses) = max_uses {
        if !(MIN_INVITE_USES..=MAX_INVITE_USES).contains(&uses) {
            return Err(format!(
                "Max uses must be between {} and {}",
                MIN_INVITE_USES, MAX_INVITE_USES
            ));
        }
    }
    Ok(())
}

pub fn validate_access_notes(notes: &str) -> Result<(), String> {
    if notes.len() > MAX_ACCESS_NOTES_LENGTH {
        return Err(format!(
            "Notes must be at most {} characters",
            MAX_ACCESS_NOTES_LENGTH
        ));
    }
    Ok(())
}
