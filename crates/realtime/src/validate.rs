//! Payload validation. Rejections happen before any state mutation or
//! broadcast, so a failed request is a no-op from the room's perspective.

use crate::error::{RealtimeError, RealtimeResult};

const MAX_EMOJI_LENGTH: usize = 32;
const MAX_ROOM_ID_LENGTH: usize = 255;

pub fn message_content(content: &str, max_length: usize) -> RealtimeResult<()> {
    if content.trim().is_empty() {
        return Err(RealtimeError::invalid_payload(
            "message content cannot be empty",
        ));
    }

    if content.chars().count() > max_length {
        return Err(RealtimeError::invalid_payload(format!(
            "message content too long (max {max_length} characters)"
        )));
    }

    Ok(())
}

pub fn room_id(room_id: &str) -> RealtimeResult<()> {
    if room_id.trim().is_empty() {
        return Err(RealtimeError::invalid_payload("room id cannot be empty"));
    }

    if room_id.len() > MAX_ROOM_ID_LENGTH {
        return Err(RealtimeError::invalid_payload("room id too long"));
    }

    Ok(())
}

pub fn emoji(emoji: &str) -> RealtimeResult<()> {
    if emoji.trim().is_empty() {
        return Err(RealtimeError::invalid_payload("emoji cannot be empty"));
    }

    if emoji.chars().count() > MAX_EMOJI_LENGTH {
        return Err(RealtimeError::invalid_payload("emoji too long"));
    }

    Ok(())
}
