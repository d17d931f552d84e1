//! The message record shown in a room.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{MessageId, RoomId, SenderIdentity};

/// Delivery state of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    /// Created locally, not yet acknowledged by the backend.
    Pending,
    /// Acknowledged by the backend or delivered by the live feed.
    #[default]
    Confirmed,
}

/// A chat message as held by the message store.
///
/// `body` is always encoded markup, never raw user input. `created_at` is
/// unix milliseconds and is used for display only; ordering is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Provisional or confirmed id.
    pub id: MessageId,
    /// Owning room.
    pub room_id: RoomId,
    /// Sender user id.
    pub sender_id: String,
    /// Sender nickname, if the backend expanded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_nickname: Option<String>,
    /// Encoded markup.
    pub body: String,
    /// Creation time in unix milliseconds.
    pub created_at: u64,
    /// Pending until acknowledged.
    #[serde(default)]
    pub state: MessageState,
}

impl Message {
    /// Build a provisional message for an optimistic send.
    pub fn provisional(room_id: RoomId, sender: &SenderIdentity, body: String) -> Self {
        Self {
            id: MessageId::provisional(),
            room_id,
            sender_id: sender.id.clone(),
            sender_nickname: sender.nickname.clone(),
            body,
            created_at: now_millis(),
            state: MessageState::Pending,
        }
    }

    /// Whether this message is still awaiting backend acknowledgement.
    pub fn is_pending(&self) -> bool {
        self.state == MessageState::Pending
    }

    /// Nickname, falling back to the sender id when absent or blank.
    pub fn display_name(&self) -> &str {
        match self.sender_nickname.as_deref() {
            Some(nick) if !nick.trim().is_empty() => nick,
            _ => &self.sender_id,
        }
    }

    /// Relative age label ("3m ago") as of `now_ms`.
    pub fn age_label(&self, now_ms: u64) -> String {
        format_age(self.created_at, now_ms)
    }
}

/// Current wall-clock time in unix milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Render the age of a timestamp for display.
///
/// Timestamps in the future (clock skew) render as "just now".
pub fn format_age(created_at_ms: u64, now_ms: u64) -> String {
    let secs = now_ms.saturating_sub(created_at_ms) / 1000;
    match secs {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        Message {
            id: MessageId::new("m1"),
            room_id: RoomId::new("general"),
            sender_id: "u1".into(),
            sender_nickname: Some("ada".into()),
            body: "hi".into(),
            created_at: 1_705_000_000_000,
            state: MessageState::Confirmed,
        }
    }

    #[test]
    fn provisional_message_is_pending() {
        let sender = SenderIdentity::new("u1").with_nickname("ada");
        let msg = Message::provisional(RoomId::new("general"), &sender, "hello".into());

        assert!(msg.is_pending());
        assert!(msg.id.is_provisional());
        assert_eq!(msg.sender_id, "u1");
        assert_eq!(msg.sender_nickname.as_deref(), Some("ada"));
        assert!(msg.created_at > 0);
    }

    #[test]
    fn display_name_falls_back_to_sender_id() {
        let mut msg = sample();
        assert_eq!(msg.display_name(), "ada");

        msg.sender_nickname = None;
        assert_eq!(msg.display_name(), "u1");

        msg.sender_nickname = Some("   ".into());
        assert_eq!(msg.display_name(), "u1");
    }

    #[test]
    fn backend_json_defaults_to_confirmed() {
        let json = r#"{
            "id": "m9",
            "roomId": "general",
            "senderId": "u2",
            "body": "<em>x</em>",
            "createdAt": 1705000000000
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();

        assert_eq!(msg.id, MessageId::new("m9"));
        assert_eq!(msg.state, MessageState::Confirmed);
        assert_eq!(msg.sender_nickname, None);
    }

    #[test]
    fn age_labels() {
        let base = 1_000_000_000;
        assert_eq!(format_age(base, base + 5_000), "just now");
        assert_eq!(format_age(base, base + 3 * 60_000), "3m ago");
        assert_eq!(format_age(base, base + 2 * 3_600_000), "2h ago");
        assert_eq!(format_age(base, base + 3 * 86_400_000), "3d ago");
    }

    #[test]
    fn future_timestamps_render_just_now() {
        assert_eq!(format_age(10_000, 0), "just now");
    }
}
